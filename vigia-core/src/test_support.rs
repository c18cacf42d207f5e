use serde_json::Value;

const HEMOGRAMA_COMPLETO: &str = include_str!("../tests/fixtures/hemograma_completo.json");

/// A bundle that passes every stage: panel first, then the 24 items.
pub(crate) fn valid_bundle() -> Value {
    serde_json::from_str(HEMOGRAMA_COMPLETO).expect("fixture is valid JSON")
}

/// The first Observation of the fixture (the CBC panel).
pub(crate) fn panel_observation() -> Value {
    valid_bundle()["entry"][0]["resource"].clone()
}

/// The second Observation of the fixture (a simple item).
pub(crate) fn item_observation() -> Value {
    valid_bundle()["entry"][1]["resource"].clone()
}
