use host_integration::{Document, TriggerAnchor, ViewportTrigger, ViewportTriggers};
use shared::domain::ElementId;
use tracing::{debug, warn};

pub fn is_scoped_to(document: &dyn Document, root: ElementId, trigger: &ViewportTrigger) -> bool {
    let anchor = match &trigger.anchor {
        Some(TriggerAnchor::Selector(selector)) => document.query_within(root, selector),
        Some(TriggerAnchor::Element(element)) => Some(*element),
        None => None,
    };
    let Some(anchor) = anchor else {
        return false;
    };
    if !document.contains(root, anchor) {
        return false;
    }
    trigger
        .animation_targets
        .iter()
        .all(|target| document.contains(root, *target))
}

pub fn release_triggers_in(
    document: &dyn Document,
    triggers: &dyn ViewportTriggers,
    root: ElementId,
) -> usize {
    let mut killed = 0;
    for trigger in triggers.registrations() {
        if !is_scoped_to(document, root, &trigger) {
            continue;
        }
        match triggers.kill(trigger.id) {
            Ok(()) => killed += 1,
            Err(err) => warn!(trigger = trigger.id, %err, "viewport: failed to kill trigger"),
        }
    }
    debug!(?root, killed, "viewport: released container triggers");
    killed
}

#[cfg(test)]
mod tests {
    use host_integration::sim::{SimulatedSite, SECTION_SELECTOR};

    use super::*;

    #[test]
    fn only_triggers_fully_inside_the_container_are_killed() {
        let site = SimulatedSite::build();
        let container = site.router.create_container("Home");
        let section = site
            .document
            .query_within(container, SECTION_SELECTOR)
            .expect("section");

        let by_selector = site.triggers.register(
            Some(TriggerAnchor::Selector(SECTION_SELECTOR.into())),
            vec![section],
        );
        let by_element = site
            .triggers
            .register(Some(TriggerAnchor::Element(section)), Vec::new());
        // Anchored in the page but animating the persistent nav.
        let drives_nav = site.triggers.register(
            Some(TriggerAnchor::Selector(SECTION_SELECTOR.into())),
            vec![site.nav],
        );
        let nav_owned = site
            .triggers
            .register(Some(TriggerAnchor::Element(site.nav)), vec![site.logo]);
        let unanchored = site.triggers.register(None, vec![section]);

        let killed = release_triggers_in(site.document.as_ref(), site.triggers.as_ref(), container);
        assert_eq!(killed, 2);
        assert_eq!(site.triggers.killed(), vec![by_selector, by_element]);
        assert_eq!(site.triggers.live_ids(), vec![drives_nav, nav_owned, unanchored]);
    }

    #[test]
    fn selector_anchor_missing_from_container_is_kept() {
        let site = SimulatedSite::build();
        let container = site.router.create_container("Team");
        let id = site
            .triggers
            .register(Some(TriggerAnchor::Selector(".nav".into())), Vec::new());

        assert_eq!(
            release_triggers_in(site.document.as_ref(), site.triggers.as_ref(), container),
            0
        );
        assert_eq!(site.triggers.live_ids(), vec![id]);
    }
}
