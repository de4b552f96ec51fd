use crate::constants::limits::OVERVIEW_SAMPLE_SIZE;
use crate::errors::ToolError;
use crate::managers::DomainArgs;
use crate::mcp::envelope::Envelope;
use crate::services::backend::{Backend, Detail, Endpoint};
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::utils::args::parse_args;
use crate::utils::fields::{Fields, Truthy};
use crate::utils::text::contains_folded;
use crate::utils::tool_errors::unknown_tool_error;
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const TOOLS: &[&str] = &[
    "get_psa_clients",
    "get_psa_contacts",
    "get_psa_members",
    "add_psa_contact",
    "search_psa_entities",
    "get_psa_overview",
];

/// Fields the entity search looks at.
const SEARCH_FIELDS: &[&str] = &["name", "firstName", "lastName", "email", "companyName"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Clients,
    Contacts,
    Members,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Clients, EntityKind::Contacts, EntityKind::Members];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "clients" => Some(EntityKind::Clients),
            "contacts" => Some(EntityKind::Contacts),
            "members" => Some(EntityKind::Members),
            _ => None,
        }
    }

    /// Payload key, also the overview section name.
    pub fn key(self) -> &'static str {
        match self {
            EntityKind::Clients => "clients",
            EntityKind::Contacts => "contacts",
            EntityKind::Members => "members",
        }
    }

    fn path(self) -> &'static str {
        match self {
            EntityKind::Clients => "/psa/getClients",
            EntityKind::Contacts => "/psa/getContacts",
            EntityKind::Members => "/psa/getMembers",
        }
    }

    fn empty_message(self) -> &'static str {
        match self {
            EntityKind::Clients => "No clients found",
            EntityKind::Contacts => "No contacts found",
            EntityKind::Members => "No members found",
        }
    }

    fn tool(self) -> &'static str {
        match self {
            EntityKind::Clients => "get_psa_clients",
            EntityKind::Contacts => "get_psa_contacts",
            EntityKind::Members => "get_psa_members",
        }
    }

    /// Display name used in overview samples.
    fn sample_name(self, entity: &Value) -> Value {
        match self {
            EntityKind::Contacts => Value::String(format!(
                "{} {}",
                entity.get("firstName").and_then(Value::as_str).unwrap_or(""),
                entity.get("lastName").and_then(Value::as_str).unwrap_or("")
            )),
            _ => entity
                .get("name")
                .cloned()
                .unwrap_or_else(|| Value::String("Unknown".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewPsaContact {
    pub msp_custom_domain: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_id: i64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_type_id: Option<i64>,
    #[serde(default)]
    pub phone_type_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    msp_custom_domain: String,
    entity_type: String,
    #[serde(default)]
    search_term: Option<String>,
}

/// Vendor-neutral directory data behind `/psa`.
#[derive(Clone)]
pub struct PsaManager {
    logger: Logger,
    backend: Backend,
}

impl PsaManager {
    pub fn new(logger: Logger, backend: Backend) -> Self {
        Self {
            logger: logger.child("psa"),
            backend: backend.child("psa"),
        }
    }

    pub async fn entities(&self, kind: EntityKind, msp_custom_domain: &str) -> Envelope {
        self.backend
            .call(
                Endpoint::get(kind.path())
                    .query("mspCustomDomain", msp_custom_domain)
                    .payload(kind.key())
                    .empty_on_no_content(kind.empty_message()),
            )
            .await
    }

    pub async fn clients(&self, msp_custom_domain: &str) -> Envelope {
        self.entities(EntityKind::Clients, msp_custom_domain).await
    }

    pub async fn add_contact(&self, contact: &NewPsaContact) -> Envelope {
        let body = Fields::new()
            .put("firstName", contact.first_name.as_str())
            .put("lastName", contact.last_name.as_str())
            .put("email", contact.email.as_str())
            .put("psaCompanyId", contact.company_id)
            .put_truthy("phone", &contact.phone)
            .put_truthy("emailTypeId", &contact.email_type_id)
            .put_truthy("phoneTypeId", &contact.phone_type_id)
            .into_value();
        self.backend
            .call(
                Endpoint::post("/psa")
                    .segment(&contact.msp_custom_domain)
                    .segment("addPSAContact")
                    .json(body)
                    .payload("contact")
                    .not_found(
                        "PSA integration not found or contact creation failed",
                        Detail::Fixed("No PSA integration configured for this domain".to_string()),
                    ),
            )
            .await
    }

    /// Full listing of one entity type, narrowed client-side when a search
    /// term is given.
    pub async fn search(
        &self,
        msp_custom_domain: &str,
        entity_type: &str,
        search_term: &Option<String>,
    ) -> Envelope {
        let Some(kind) = EntityKind::parse(entity_type) else {
            return Envelope::validation_error(format!(
                "Invalid entity type: {}. Entity type must be 'clients', 'contacts', or 'members'",
                entity_type
            ));
        };
        let mut listing = self.entities(kind, msp_custom_domain).await;
        if !listing.success {
            return listing;
        }
        let term = match search_term {
            Some(term) if term.is_truthy() => term,
            _ => return listing,
        };
        let entities = match listing.get(kind.key()) {
            Some(Value::Array(items)) if !items.is_empty() => items.clone(),
            _ => return listing,
        };
        let filtered = filter_entities(entities, term);
        let total_found = filtered.len();
        listing.insert(kind.key(), Value::Array(filtered));
        listing.insert("filtered", true);
        listing.insert("search_term", term.as_str());
        listing.insert("total_found", total_found);
        listing
    }

    /// Counts and name samples for every entity type. Each listing is
    /// attempted even when an earlier one failed.
    pub async fn overview(&self, msp_custom_domain: &str) -> Envelope {
        let mut sections = Map::new();
        let mut overall_success = true;
        for kind in EntityKind::ALL {
            let listing = self.entities(kind, msp_custom_domain).await;
            if !listing.success {
                overall_success = false;
                self.logger.warn(
                    "overview section failed",
                    Some(&json!({ "section": kind.key(), "error": listing.error })),
                );
            }
            sections.insert(kind.key().to_string(), overview_section(kind, &listing));
        }
        let mut envelope = Envelope::aggregate(overall_success).with("msp_domain", msp_custom_domain);
        for (key, section) in sections {
            envelope.insert(&key, section);
        }
        envelope.with("overall_success", overall_success)
    }

    pub async fn handle_tool(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        if let Some(kind) = EntityKind::ALL.into_iter().find(|kind| kind.tool() == tool) {
            let args: DomainArgs = parse_args(tool, args)?;
            return Ok(self.entities(kind, &args.msp_custom_domain).await);
        }
        match tool {
            "add_psa_contact" => {
                let contact: NewPsaContact = parse_args(tool, args)?;
                Ok(self.add_contact(&contact).await)
            }
            "search_psa_entities" => {
                let args: SearchArgs = parse_args(tool, args)?;
                Ok(self
                    .search(&args.msp_custom_domain, &args.entity_type, &args.search_term)
                    .await)
            }
            "get_psa_overview" => {
                let args: DomainArgs = parse_args(tool, args)?;
                Ok(self.overview(&args.msp_custom_domain).await)
            }
            _ => Err(unknown_tool_error(tool, TOOLS)),
        }
    }
}

fn field_text(entity: &Value, field: &str) -> String {
    match entity.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn filter_entities(entities: Vec<Value>, term: &str) -> Vec<Value> {
    let needle = term.to_lowercase();
    entities
        .into_iter()
        .filter(|entity| {
            entity.is_object()
                && SEARCH_FIELDS
                    .iter()
                    .any(|field| contains_folded(&field_text(entity, field), &needle))
        })
        .collect()
}

fn overview_section(kind: EntityKind, listing: &Envelope) -> Value {
    if !listing.success {
        return json!({
            "count": 0,
            "status": "failed",
            "error": listing.error,
        });
    }
    let items = listing
        .get(kind.key())
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut section = Fields::new()
        .put("count", items.len())
        .put("status", "success");
    if !items.is_empty() {
        let sample: Vec<Value> = items
            .iter()
            .take(OVERVIEW_SAMPLE_SIZE)
            .map(|entity| kind.sample_name(entity))
            .collect();
        section = section.put("sample", sample);
    }
    section.into_value()
}

#[async_trait::async_trait]
impl ToolHandler for PsaManager {
    async fn handle(&self, tool: &str, args: Value) -> Result<Envelope, ToolError> {
        self.handle_tool(tool, args).await
    }
}
