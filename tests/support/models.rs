use arangodantic::{ArangodanticError, Document, Edge, Endpoints, Meta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
pub struct Identity {
    #[serde(skip)]
    pub meta: Meta,
    pub name: String,
}

impl Identity {
    pub fn new(name: &str) -> Self {
        Identity {
            meta: Meta::new(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubModel {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
#[arango(collection = "ext_identities", before_save = "Self::check")]
pub struct ExtendedIdentity {
    #[serde(skip)]
    pub meta: Meta,
    pub name: String,
    #[serde(default)]
    pub extra: Option<String>,
    pub sub: SubModel,
    #[serde(default)]
    pub saves: u32,
}

impl ExtendedIdentity {
    pub fn new(name: &str, text: &str) -> Self {
        ExtendedIdentity {
            meta: Meta::new(),
            name: name.to_string(),
            extra: None,
            sub: SubModel {
                text: text.to_string(),
            },
            saves: 0,
        }
    }

    fn check(&mut self, is_new: bool) -> Result<(), ArangodanticError> {
        if self.name.is_empty() {
            return Err(ArangodanticError::validation("name", "must not be empty"));
        }
        if is_new {
            self.extra.get_or_insert_with(|| "created".to_string());
        }
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Edge)]
pub struct Link {
    #[serde(skip)]
    pub meta: Meta,
    #[serde(skip)]
    pub endpoints: Endpoints,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Link {
    pub fn new(endpoints: Endpoints, kind: &str) -> Self {
        Link {
            meta: Meta::new(),
            endpoints,
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
pub struct Company {
    #[serde(skip)]
    #[arango(meta)]
    pub identity: Meta,
    pub company_id: String,
    #[serde(default)]
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub first_name: String,
    pub last_name: String,
}

impl Company {
    pub fn new(company_id: &str) -> Self {
        Company {
            identity: Meta::new(),
            company_id: company_id.to_string(),
            owner: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Document)]
pub struct Counter {
    #[serde(skip)]
    pub meta: Meta,
    pub value: i64,
}
