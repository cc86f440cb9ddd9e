//! Process-wide registry of gates, looked up by name or symbol.
//!
//! The registry is built once on first access and never changes afterwards, so
//! it can be shared freely between threads.
//!
//! ```
//! use statevec_sim::catalog::catalog;
//!
//! let h = catalog().get("h").unwrap();
//! assert_eq!(h.name(), "H");
//! let cx = catalog().get("CX").unwrap();
//! assert_eq!(cx.name(), "CNOT");
//! let rx = catalog().resolve("RX", &[1.0]).unwrap();
//! assert_eq!(rx.name(), "RX(1.000)");
//! ```

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use crate::{
    error::{ Result, SimError },
    gate::{ self, Gate },
};

/// A family of gates built from numeric parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Parametrized {
    /// [`gate::rx`]
    Rx,
    /// [`gate::ry`]
    Ry,
    /// [`gate::rz`]
    Rz,
    /// [`gate::phase`]
    Phase,
    /// [`gate::u`]
    U,
}

impl Parametrized {
    /// Return the number of parameters the family takes.
    pub fn num_params(self) -> usize {
        match self {
            Self::Rx | Self::Ry | Self::Rz | Self::Phase => 1,
            Self::U => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Rx => "RX",
            Self::Ry => "RY",
            Self::Rz => "RZ",
            Self::Phase => "P",
            Self::U => "U",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "RX" => Some(Self::Rx),
            "RY" => Some(Self::Ry),
            "RZ" => Some(Self::Rz),
            "P" | "PHASE" => Some(Self::Phase),
            "U" | "U3" => Some(Self::U),
            _ => None,
        }
    }

    /// Build a gate, checking the parameter count.
    pub fn build(self, params: &[f64]) -> Result<Gate> {
        if params.len() != self.num_params() {
            return Err(SimError::InvalidParameters {
                gate: self.name().to_string(),
                expected: self.num_params(),
                got: params.len(),
            });
        }
        let gate = match self {
            Self::Rx => gate::rx(params[0]),
            Self::Ry => gate::ry(params[0]),
            Self::Rz => gate::rz(params[0]),
            Self::Phase => gate::phase(params[0]),
            Self::U => gate::u(params[0], params[1], params[2]),
        };
        Ok(gate)
    }
}

/// Immutable lookup table of fixed gates.
#[derive(Clone, Debug)]
pub struct GateCatalog {
    gates: Vec<Gate>,
    // upper-cased name or symbol -> index into `gates`
    index: FxHashMap<String, usize>,
}

static CATALOG: Lazy<GateCatalog> = Lazy::new(GateCatalog::standard);

/// Return the shared standard catalog.
pub fn catalog() -> &'static GateCatalog { &CATALOG }

impl GateCatalog {
    /// Build a catalog containing all fixed gates in [`gate`].
    pub fn standard() -> Self {
        let gates: Vec<Gate> = [
            &gate::ID,
            &gate::PAULI_X,
            &gate::PAULI_Y,
            &gate::PAULI_Z,
            &gate::HADAMARD,
            &gate::S,
            &gate::SDG,
            &gate::T,
            &gate::TDG,
            &gate::CNOT,
            &gate::CZ,
            &gate::SWAP,
            &gate::TOFFOLI,
        ]
        .into_iter()
        .map(|g| (**g).clone())
        .collect();
        Self::from_gates(gates)
    }

    /// Build a catalog from an arbitrary list of gates.
    ///
    /// Names take precedence over symbols, and earlier gates over later ones,
    /// when keys collide.
    pub fn from_gates(gates: Vec<Gate>) -> Self {
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        for (k, g) in gates.iter().enumerate() {
            index.entry(g.name().to_uppercase()).or_insert(k);
        }
        for (k, g) in gates.iter().enumerate() {
            index.entry(g.symbol().to_uppercase()).or_insert(k);
        }
        Self { gates, index }
    }

    /// Look up a fixed gate by name or symbol, ignoring case.
    pub fn get(&self, key: &str) -> Option<&Gate> {
        self.index.get(&key.to_uppercase()).map(|&k| &self.gates[k])
    }

    /// Look up a fixed gate, or build a parametrized one.
    ///
    /// Fixed gates must be requested with no parameters; the parametrized
    /// families are `RX`, `RY`, `RZ`, `P` (alias `PHASE`), and `U` (alias
    /// `U3`).
    pub fn resolve(&self, key: &str, params: &[f64]) -> Result<Gate> {
        let upper = key.to_uppercase();
        if let Some(fam) = Parametrized::from_key(&upper) {
            return fam.build(params);
        }
        let gate = self.get(&upper)
            .ok_or_else(|| SimError::UnknownGate(key.to_string()))?;
        if !params.is_empty() {
            return Err(SimError::InvalidParameters {
                gate: gate.name().to_string(),
                expected: 0,
                got: params.len(),
            });
        }
        Ok(gate.clone())
    }

    /// Iterate over all fixed gates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Gate> + '_ { self.gates.iter() }

    /// Return the names of all fixed gates in insertion order.
    pub fn names(&self) -> Vec<&str> { self.gates.iter().map(Gate::name).collect() }

    pub fn len(&self) -> usize { self.gates.len() }

    pub fn is_empty(&self) -> bool { self.gates.is_empty() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup() {
        let cat = catalog();
        assert_eq!(cat.len(), 13);
        assert_eq!(cat.get("x").unwrap(), &*gate::PAULI_X);
        assert_eq!(cat.get("cx").unwrap().name(), "CNOT");
        assert_eq!(cat.get("CCX").unwrap().name(), "TOFFOLI");
        assert_eq!(cat.get("s†").unwrap().name(), "SDG");
        assert!(cat.get("nope").is_none());
        assert_eq!(cat.names()[..3], ["I", "X", "Y"]);
    }

    #[test]
    fn resolve() {
        let cat = catalog();
        assert_eq!(cat.resolve("swap", &[]).unwrap().name(), "SWAP");
        assert_eq!(cat.resolve("rz", &[0.5]).unwrap(), gate::rz(0.5));
        assert_eq!(cat.resolve("U3", &[0.1, 0.2, 0.3]).unwrap(), gate::u(0.1, 0.2, 0.3));
        assert_eq!(
            cat.resolve("RX", &[]),
            Err(SimError::InvalidParameters {
                gate: "RX".to_string(),
                expected: 1,
                got: 0,
            }),
        );
        assert!(matches!(
            cat.resolve("H", &[1.0]),
            Err(SimError::InvalidParameters { expected: 0, got: 1, .. }),
        ));
        assert_eq!(
            cat.resolve("frob", &[]),
            Err(SimError::UnknownGate("frob".to_string())),
        );
    }

    #[test]
    fn shared_between_threads() {
        let names: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| catalog().get("H").unwrap().name().to_string()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(names.iter().all(|n| n == "H"));
    }
}
