//! Domain records returned by the identity and process services.

use preserves::IOValue;
use serde::{Deserialize, Serialize};

/// A battery cell identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Service-assigned identifier.
    pub id: String,
    /// Human-facing asset identifier printed on the marker.
    pub nvid: String,
}

/// A module identity (a group of cells).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Module {
    /// Service-assigned identifier.
    pub id: String,
    /// Human-facing asset identifier printed on the marker.
    pub nvid: String,
    /// Identifiers of the cells mounted in this module.
    #[serde(default)]
    pub cells: Vec<String>,
}

/// A pack identity (a group of modules).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pack {
    /// Service-assigned identifier.
    pub id: String,
    /// Human-facing asset identifier printed on the marker.
    pub nvid: String,
    /// Identifiers of the modules mounted in this pack.
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Identity record returned by the digital-twin lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Identity {
    /// Cell identity.
    Cell(Cell),
    /// Module identity.
    Module(Module),
    /// Pack identity.
    Pack(Pack),
}

impl Identity {
    /// Kind tag of the variant, as scripts see it.
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Cell(_) => "cell",
            Identity::Module(_) => "module",
            Identity::Pack(_) => "pack",
        }
    }

    /// Identifier shared by every variant.
    pub fn id(&self) -> &str {
        match self {
            Identity::Cell(cell) => &cell.id,
            Identity::Module(module) => &module.id,
            Identity::Pack(pack) => &pack.id,
        }
    }

    /// Borrow the cell record, if this is one.
    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            Identity::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    /// Borrow the module record, if this is one.
    pub fn as_module(&self) -> Option<&Module> {
        match self {
            Identity::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Borrow the pack record, if this is one.
    pub fn as_pack(&self) -> Option<&Pack> {
        match self {
            Identity::Pack(pack) => Some(pack),
            _ => None,
        }
    }

    /// Render the identity as a preserves record labelled with its kind.
    pub fn to_io_value(&self) -> IOValue {
        let mut fields = vec![
            IOValue::new(self.id().to_string()),
            IOValue::new(self.nvid().to_string()),
        ];
        let children = match self {
            Identity::Cell(_) => None,
            Identity::Module(module) => Some(&module.cells),
            Identity::Pack(pack) => Some(&pack.modules),
        };
        if let Some(children) = children {
            let ids: Vec<IOValue> = children.iter().map(|id| IOValue::new(id.clone())).collect();
            fields.push(IOValue::new(ids));
        }
        IOValue::record(IOValue::symbol(self.kind()), fields)
    }

    fn nvid(&self) -> &str {
        match self {
            Identity::Cell(cell) => &cell.nvid,
            Identity::Module(module) => &module.nvid,
            Identity::Pack(pack) => &pack.nvid,
        }
    }
}

/// A single process step result recorded against an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Result identifier.
    pub id: String,
    /// Asset identifier the result was recorded for.
    pub identity: String,
    /// Process kind tag (e.g. "formation", "aging").
    pub kind: String,
}

impl ProcessResult {
    /// Render the result as a `process-result` preserves record.
    pub fn to_io_value(&self) -> IOValue {
        IOValue::record(
            IOValue::symbol("process-result"),
            vec![
                IOValue::new(self.id.clone()),
                IOValue::new(self.identity.clone()),
                IOValue::new(self.kind.clone()),
            ],
        )
    }
}
