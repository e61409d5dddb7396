use std::time::Duration;

use shared::domain::ElementId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenProp {
    Opacity(f32),
    TranslateYVh(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    Power4InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaggerFrom {
    Start,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stagger {
    pub amount: Duration,
    pub from: StaggerFrom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub targets: Vec<ElementId>,
    pub from: Vec<TweenProp>,
    pub to: Vec<TweenProp>,
    pub duration: Duration,
    pub ease: Ease,
    pub at: Duration,
    pub stagger: Option<Stagger>,
}

impl Tween {
    pub fn to(targets: Vec<ElementId>, to: Vec<TweenProp>, duration: Duration) -> Self {
        Self {
            targets,
            from: Vec::new(),
            to,
            duration,
            ease: Ease::Linear,
            at: Duration::ZERO,
            stagger: None,
        }
    }

    pub fn from_to(
        targets: Vec<ElementId>,
        from: Vec<TweenProp>,
        to: Vec<TweenProp>,
        duration: Duration,
    ) -> Self {
        Self {
            from,
            ..Self::to(targets, to, duration)
        }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn at(mut self, at: Duration) -> Self {
        self.at = at;
        self
    }

    pub fn stagger(mut self, amount: Duration, from: StaggerFrom) -> Self {
        self.stagger = Some(Stagger { amount, from });
        self
    }

    pub fn start_of(&self, index: usize) -> Duration {
        let Some(stagger) = self.stagger else {
            return self.at;
        };
        let spread = self.targets.len().saturating_sub(1);
        if spread == 0 {
            return self.at;
        }
        self.at + stagger.amount * index.min(spread) as u32 / spread as u32
    }

    pub fn end(&self) -> Duration {
        let last = self.targets.len().saturating_sub(1);
        self.start_of(last) + self.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub label: &'static str,
    pub tweens: Vec<Tween>,
}

impl Timeline {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            tweens: Vec::new(),
        }
    }

    pub fn with(mut self, tween: Tween) -> Self {
        self.tweens.push(tween);
        self
    }

    pub fn total_duration(&self) -> Duration {
        self.tweens
            .iter()
            .map(Tween::end)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staggered_tween_ends_after_last_target() {
        let tween = Tween::to(
            vec![ElementId(1), ElementId(2), ElementId(3)],
            vec![TweenProp::TranslateYVh(0.0)],
            Duration::from_millis(800),
        )
        .stagger(Duration::from_millis(150), StaggerFrom::Random);

        assert_eq!(tween.start_of(0), Duration::ZERO);
        assert_eq!(tween.start_of(2), Duration::from_millis(150));
        assert_eq!(tween.end(), Duration::from_millis(950));
    }

    #[test]
    fn timeline_duration_covers_offset_tweens() {
        let timeline = Timeline::new("reveal")
            .with(
                Tween::to(vec![ElementId(1)], vec![TweenProp::Opacity(1.0)], Duration::from_millis(200))
                    .at(Duration::from_millis(100)),
            )
            .with(Tween::to(
                vec![ElementId(2)],
                vec![TweenProp::TranslateYVh(-100.0)],
                Duration::from_millis(250),
            ));
        assert_eq!(timeline.total_duration(), Duration::from_millis(300));
        assert_eq!(Timeline::new("empty").total_duration(), Duration::ZERO);
    }
}
