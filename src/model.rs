//! Canonical Petri net model.
//!
//! The serde representation is the JSON wire format spoken by the hosted
//! engine, so a [`PetriNet`] can be handed to the worker as text and read back
//! without any additional mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Token counts keyed by place id.
pub type Marking = BTreeMap<String, u64>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub label: Option<String>,
}

/// Direction of an arc, without its endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    TransitionToPlace,
    PlaceToTransition,
}

/// Pre-oriented arc endpoints `(from, to)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "nodes")]
pub enum ArcType {
    TransitionPlace(String, String),
    PlaceTransition(String, String),
}

impl ArcType {
    pub fn direction(&self) -> ArcDirection {
        match self {
            ArcType::TransitionPlace(..) => ArcDirection::TransitionToPlace,
            ArcType::PlaceTransition(..) => ArcDirection::PlaceToTransition,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        match self {
            ArcType::TransitionPlace(from, to) | ArcType::PlaceTransition(from, to) => {
                (from.as_str(), to.as_str())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub from_to: ArcType,
    pub weight: u32,
}

impl Arc {
    pub fn new(from_to: ArcType) -> Self {
        Self { from_to, weight: 1 }
    }

    pub fn direction(&self) -> ArcDirection {
        self.from_to.direction()
    }

    pub fn endpoints(&self) -> (&str, &str) {
        self.from_to.endpoints()
    }
}

/// Places, transitions, weighted arcs and optional markings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetriNet {
    #[serde(default)]
    pub places: BTreeMap<String, Place>,
    #[serde(default)]
    pub transitions: BTreeMap<String, Transition>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_marking: Option<Marking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_markings: Option<Vec<Marking>>,
}

impl PetriNet {
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Checks that places and transitions have distinct ids and that every
    /// arc endpoint exists in `places` or `transitions` consistently with the
    /// arc direction.
    ///
    /// Nothing beyond this structural check is enforced.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(id) = self
            .places
            .keys()
            .find(|id| self.transitions.contains_key(*id))
        {
            return Err(ModelError::DuplicateId { id: id.clone() });
        }
        for arc in &self.arcs {
            let (from, to) = arc.endpoints();
            let ok = match arc.direction() {
                ArcDirection::PlaceToTransition => {
                    self.places.contains_key(from) && self.transitions.contains_key(to)
                }
                ArcDirection::TransitionToPlace => {
                    self.transitions.contains_key(from) && self.places.contains_key(to)
                }
            };
            if !ok {
                return Err(ModelError::InvalidArc {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Initial token count of a place, `None` when absent.
    pub fn initial_tokens(&self, place: &str) -> Option<u64> {
        self.initial_marking
            .as_ref()
            .and_then(|m| m.get(place))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_wire_format() {
        let arc = Arc::new(ArcType::PlaceTransition("p1".into(), "t1".into()));
        let json = serde_json::to_value(&arc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from_to": { "type": "PlaceTransition", "nodes": ["p1", "t1"] },
                "weight": 1
            })
        );
    }

    #[test]
    fn parses_engine_output() {
        let text = r#"{
            "places": { "p": { "id": "p" } },
            "transitions": { "t": { "id": "t", "label": null } },
            "arcs": [ { "from_to": { "type": "TransitionPlace", "nodes": ["t", "p"] }, "weight": 2 } ],
            "final_markings": [ { "p": 1 } ]
        }"#;
        let pn = PetriNet::from_json(text).unwrap();
        assert_eq!(pn.arcs[0].direction(), ArcDirection::TransitionToPlace);
        assert_eq!(pn.arcs[0].weight, 2);
        assert_eq!(pn.transitions["t"].label, None);
        assert!(pn.initial_marking.is_none());
        assert_eq!(pn.final_markings.as_ref().unwrap()[0]["p"], 1);
        pn.validate().unwrap();
    }

    #[test]
    fn validate_rejects_misoriented_arc() {
        let mut pn = PetriNet::default();
        pn.places.insert("p".into(), Place { id: "p".into() });
        pn.transitions.insert(
            "t".into(),
            Transition {
                id: "t".into(),
                label: None,
            },
        );
        pn.arcs
            .push(Arc::new(ArcType::TransitionPlace("p".into(), "t".into())));
        assert!(matches!(pn.validate(), Err(ModelError::InvalidArc { .. })));
    }

    #[test]
    fn validate_rejects_shared_ids() {
        let text = r#"{
            "places": { "x": { "id": "x" } },
            "transitions": { "x": { "id": "x", "label": "Ship" } },
            "arcs": []
        }"#;
        let pn = PetriNet::from_json(text).unwrap();
        assert!(matches!(
            pn.validate(),
            Err(ModelError::DuplicateId { id }) if id == "x"
        ));
    }

    #[test]
    fn absent_markings_are_omitted() {
        let json = PetriNet::default().to_json().unwrap();
        assert!(!json.contains("initial_marking"));
        assert!(!json.contains("final_markings"));
    }
}
