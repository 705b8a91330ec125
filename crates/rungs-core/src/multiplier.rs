use crate::config::Catalog;

/// Specialization factor for an event type.
///
/// Both the event type and every bonus source go through the alias table, so
/// a bonus declared on `appointment` matches an `appointment_set` event and
/// the other way round. Returns 1.0 without a specialization, for an unknown
/// specialization, or when the specialization does not boost this event.
#[must_use]
pub fn multiplier_for(catalog: &Catalog, specialization: Option<&str>, event_type: &str) -> f64 {
    let Some(spec) = specialization.and_then(|id| catalog.specialization(id)) else {
        return 1.0;
    };
    let vocabulary = catalog.vocabulary();
    let event_key = vocabulary.canonical(event_type);
    spec.bonuses
        .iter()
        .find(|bonus| vocabulary.canonical(&bonus.source) == event_key)
        .map_or(1.0, |bonus| bonus.multiplier)
}
