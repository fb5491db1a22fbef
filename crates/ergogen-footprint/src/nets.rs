use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexSet;

use crate::escape_kicad_text;

/// A net identity. Index 0 is the unconnected net.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Net {
    pub name: String,
    pub index: usize,
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(net {} \"{}\")", self.index, escape_kicad_text(&self.name))
    }
}

/// Board-wide net table. Names are numbered from 1 in first-request order.
#[derive(Debug, Default)]
pub struct NetRegistry {
    order: Mutex<IndexSet<String>>,
}

impl NetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `name`, allocating one if it is new.
    pub fn ensure(&self, name: &str) -> usize {
        if name.is_empty() {
            return 0;
        }
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(idx) = order.get_index_of(name) {
            return idx + 1;
        }
        let (idx, _) = order.insert_full(name.to_string());
        tracing::trace!(net = name, index = idx + 1, "allocated net");
        idx + 1
    }

    pub fn net(&self, name: &str) -> Net {
        Net {
            name: name.to_string(),
            index: self.ensure(name),
        }
    }

    /// Net names in index order, starting at index 1.
    pub fn names(&self) -> Vec<String> {
        self.order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// The nets visible to one footprint instance.
///
/// Local names are prefixed with the instance reference, so two instances
/// asking for the same local name get distinct nets. They still live in the
/// board-wide table: `global_net("D1_mid")` is the same net as `D1`'s
/// `local_net("mid")`.
#[derive(Debug, Clone)]
pub struct NetScope {
    ref_str: String,
    nets: Arc<NetRegistry>,
}

impl NetScope {
    pub fn new(ref_str: impl Into<String>, nets: Arc<NetRegistry>) -> Self {
        Self {
            ref_str: ref_str.into(),
            nets,
        }
    }

    pub fn local_net(&self, id: &str) -> Net {
        self.nets.net(&format!("{}_{}", self.ref_str, id))
    }

    pub fn global_net(&self, name: &str) -> Net {
        self.nets.net(name)
    }

    pub fn registry(&self) -> &Arc<NetRegistry> {
        &self.nets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_nets_share_the_board_namespace() {
        let nets = Arc::new(NetRegistry::new());
        let d1 = NetScope::new("D1", Arc::clone(&nets));
        let d2 = NetScope::new("D2", Arc::clone(&nets));
        let local = d1.local_net("mid");
        assert_eq!(d2.global_net("D1_mid"), local);
        assert_ne!(d2.local_net("mid"), local);
    }

    #[test]
    fn local_and_global_net_naming_and_indices() {
        let nets = Arc::new(NetRegistry::new());
        let scope = NetScope::new("MCU1", Arc::clone(&nets));

        let local = scope.local_net("24");
        assert_eq!(local.name, "MCU1_24");
        assert_eq!(local.index, 1);
        assert_eq!(local.to_string(), "(net 1 \"MCU1_24\")");

        let gnd = scope.global_net("GND");
        assert_eq!(gnd.index, 2);
        assert_eq!(gnd.to_string(), "(net 2 \"GND\")");
        assert_eq!(scope.global_net("GND"), gnd);
        assert_eq!(nets.names(), vec!["MCU1_24", "GND"]);
    }

    #[test]
    fn empty_name_is_unconnected() {
        let nets = NetRegistry::new();
        let net = nets.net("");
        assert_eq!(net.index, 0);
        assert_eq!(net.to_string(), "(net 0 \"\")");
        assert!(nets.names().is_empty());
    }

    #[test]
    fn local_nets_differ_between_instances() {
        let nets = Arc::new(NetRegistry::new());
        let a = NetScope::new("D1", Arc::clone(&nets)).local_net("anode");
        let b = NetScope::new("D2", Arc::clone(&nets)).local_net("anode");
        assert_ne!(a, b);
        assert_ne!(a.index, b.index);
    }

    #[test]
    fn concurrent_global_requests_agree() {
        let nets = Arc::new(NetRegistry::new());
        let indices: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let nets = Arc::clone(&nets);
                    s.spawn(move || {
                        let scope = NetScope::new(format!("U{i}"), nets);
                        scope.local_net("x");
                        scope.global_net("VCC").index
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(indices.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(nets.names().len(), 9);
    }
}
