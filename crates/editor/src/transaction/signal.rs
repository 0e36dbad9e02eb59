//! Free-standing signals. Sub-signal markers are laid out again whenever
//! the signal rectangle or its type changes.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{ObjectId, Point3D, Signal, SignalId, SignalType};

use crate::config::EditorSettings;
use crate::derive::layout_sub_signals;
use crate::store::EntityStore;
use crate::transaction::{lookup_signal, new_object_id, Edit, EditError, KeyInfo};

fn checked(mut signal: Signal) -> Result<Signal, EditError> {
    let sizes_ok = signal.width.is_finite()
        && signal.height.is_finite()
        && signal.width > 0.0
        && signal.height > 0.0;
    if !sizes_ok {
        return Err(EditError::InvalidInput(format!(
            "signal {} size must be positive, got {} x {}",
            signal.id, signal.width, signal.height
        )));
    }
    if !signal.center.is_finite() || !signal.heading.is_finite() {
        return Err(EditError::InvalidInput(format!(
            "signal {} placement is not finite",
            signal.id
        )));
    }
    signal.sub_signals = layout_sub_signals(&signal);
    Ok(signal)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSignal {
    #[serde(default = "new_object_id")]
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub center: Point3D,
    #[serde(default)]
    pub heading: f64,
    pub width: f64,
    pub height: f64,
}

impl Edit for CreateSignal {
    fn label(&self) -> &'static str {
        "CreateSignal"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        if store.signal(&self.signal_id).is_some() {
            return Err(EditError::SignalExists(self.signal_id.clone()));
        }
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), None))
    }

    fn generate_new_key_info(
        &self,
        _old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let signal = checked(Signal {
            id: self.signal_id.clone(),
            signal_type: self.signal_type,
            center: self.center,
            heading: self.heading,
            width: self.width,
            height: self.height,
            sub_signals: Vec::new(),
        })?;
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), Some(Rc::new(signal))))
    }

    fn target_id(&self) -> ObjectId {
        self.signal_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveSignal {
    pub signal_id: SignalId,
}

impl Edit for RemoveSignal {
    fn label(&self) -> &'static str {
        "RemoveSignal"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let signal = lookup_signal(store, &self.signal_id)?;
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), Some(signal)))
    }

    fn generate_new_key_info(
        &self,
        _old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), None))
    }

    fn target_id(&self) -> ObjectId {
        self.signal_id.clone()
    }
}

/// Change any of type, placement and size. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReformatSignal {
    pub signal_id: SignalId,
    #[serde(default)]
    pub signal_type: Option<SignalType>,
    #[serde(default)]
    pub center: Option<Point3D>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl Edit for ReformatSignal {
    fn label(&self) -> &'static str {
        "ReformatSignal"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let signal = lookup_signal(store, &self.signal_id)?;
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), Some(signal)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let current = old.require_signal(&self.signal_id)?;
        let signal = checked(Signal {
            id: current.id.clone(),
            signal_type: self.signal_type.unwrap_or(current.signal_type),
            center: self.center.unwrap_or(current.center),
            heading: self.heading.unwrap_or(current.heading),
            width: self.width.unwrap_or(current.width),
            height: self.height.unwrap_or(current.height),
            sub_signals: Vec::new(),
        })?;
        Ok(KeyInfo::new().with_signal(self.signal_id.clone(), Some(Rc::new(signal))))
    }

    fn target_id(&self) -> ObjectId {
        self.signal_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EditorContext;
    use crate::transaction::{StandardTransaction, Transaction};

    fn create(ctx: &EditorContext) {
        StandardTransaction::new(CreateSignal {
            signal_id: "S1".to_string(),
            signal_type: SignalType::TrafficLightVertical,
            center: Point3D::new(10.0, 0.0, 5.0),
            heading: 0.0,
            width: 0.4,
            height: 1.2,
        })
        .commit(ctx)
        .unwrap();
    }

    #[test]
    fn test_create_lays_out_grid() {
        let ctx = EditorContext::default();
        create(&ctx);
        let signal = ctx.store.borrow().signal("S1").unwrap();
        assert_eq!(signal.sub_signals.len(), 3);
        assert!(ctx.store.borrow().dirty_signals().contains_key("S1"));
    }

    #[test]
    fn test_reformat_relayouts() {
        let ctx = EditorContext::default();
        create(&ctx);
        let mut tx = StandardTransaction::new(ReformatSignal {
            signal_id: "S1".to_string(),
            signal_type: Some(SignalType::TrafficLightHorizontal),
            width: Some(1.2),
            height: Some(0.4),
            ..Default::default()
        });
        tx.commit(&ctx).unwrap();
        let signal = ctx.store.borrow().signal("S1").unwrap();
        assert_eq!(signal.sub_signals.len(), 3);
        assert!(signal.sub_signals.iter().all(|s| (s.position.z - 5.0).abs() < 1e-12));
        assert_eq!(signal.center, Point3D::new(10.0, 0.0, 5.0));

        tx.on_undo(&ctx).unwrap();
        let signal = ctx.store.borrow().signal("S1").unwrap();
        assert_eq!(signal.signal_type, SignalType::TrafficLightVertical);
    }

    #[test]
    fn test_zero_size_rejected() {
        let ctx = EditorContext::default();
        create(&ctx);
        let result = StandardTransaction::new(ReformatSignal {
            signal_id: "S1".to_string(),
            width: Some(0.0),
            ..Default::default()
        })
        .commit(&ctx);
        assert!(matches!(result, Err(EditError::InvalidInput(_))));
    }

    #[test]
    fn test_remove_signal() {
        let ctx = EditorContext::default();
        create(&ctx);
        StandardTransaction::new(RemoveSignal {
            signal_id: "S1".to_string(),
        })
        .commit(&ctx)
        .unwrap();
        assert!(ctx.store.borrow().signal("S1").is_none());
        assert!(StandardTransaction::new(RemoveSignal {
            signal_id: "S1".to_string(),
        })
        .commit(&ctx)
        .is_err());
    }
}
