//! Record mapper: translates chat text and person records into Notion pages and back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::NotionSettings;
use crate::notion::schema::{self, Decoded, PropertySpec};
use crate::notion::{
    CreatePageRequest, DatabaseParent, NotionClient, NotionError, Page, QueryDatabaseRequest,
};

/// Notion's maximum page size for a single query.
const QUERY_PAGE_SIZE: u32 = 100;

/// One row of the person database as read back from Notion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    pub title: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: String,
}

/// Input for `add_record`. Tags and image are only written when supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    pub title: String,
    pub address: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewPerson {
    /// Properties for a create-page request, keyed by the fixed schema names.
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert(schema::NAME.to_string(), schema::title_value(&self.name));
        props.insert(schema::TITLE.to_string(), schema::rich_text_value(&self.title));
        props.insert(schema::ADDRESS.to_string(), schema::rich_text_value(&self.address));
        props.insert(schema::EMAIL.to_string(), schema::email_value(&self.email));
        props.insert(
            schema::PHONE_NUMBER.to_string(),
            schema::phone_number_value(&self.phone_number),
        );
        if let Some(tags) = &self.tags {
            props.insert(schema::TAGS.to_string(), schema::multi_select_value(tags));
        }
        if let Some(url) = self.image_url.as_deref().filter(|u| !u.is_empty()) {
            props.insert(schema::IMG.to_string(), schema::external_file_value(url));
        }
        props
    }
}

fn field<T: Default>(page_id: &str, spec: PropertySpec, decoded: Decoded<T>) -> T {
    if let Decoded::WrongType { found } = &decoded {
        log::debug!(
            "page {}: property {:?} is {:?}, expected {:?}; leaving empty",
            page_id,
            spec.key,
            found,
            spec.kind.type_name()
        );
    }
    decoded.unwrap_or_default()
}

impl PersonRecord {
    /// Decode a page. Missing or differently-typed properties leave the field empty.
    pub fn from_page(page: &Page) -> Self {
        let p = &page.properties;
        let id = page.id.as_str();
        PersonRecord {
            name: field(id, schema::NAME_SPEC, schema::decode_text(p, schema::NAME_SPEC)),
            title: field(id, schema::TITLE_SPEC, schema::decode_text(p, schema::TITLE_SPEC)),
            address: field(
                id,
                schema::ADDRESS_SPEC,
                schema::decode_text(p, schema::ADDRESS_SPEC),
            ),
            email: field(id, schema::EMAIL_SPEC, schema::decode_text(p, schema::EMAIL_SPEC)),
            phone_number: field(
                id,
                schema::PHONE_NUMBER_SPEC,
                schema::decode_text(p, schema::PHONE_NUMBER_SPEC),
            ),
            tags: field(id, schema::TAGS_SPEC, schema::decode_tags(p, schema::TAGS_SPEC)),
            image_url: field(
                id,
                schema::IMG_SPEC,
                schema::decode_external_url(p, schema::IMG_SPEC),
            ),
        }
    }
}

/// Operations the relay performs against the record database.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create one page whose title property holds `text`.
    async fn save_text(&self, text: &str) -> Result<(), NotionError>;

    /// Create one page from a person record.
    async fn add_record(&self, person: &NewPerson) -> Result<(), NotionError>;

    /// Pages whose `field` equals `value`.
    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<PersonRecord>, NotionError>;

    /// Every page of the database (first result page only).
    async fn list_all(&self) -> Result<Vec<PersonRecord>, NotionError>;
}

/// Record store backed by one Notion database.
#[derive(Clone)]
pub struct NotionRecords {
    database_id: String,
    text_property: String,
    client: NotionClient,
}

impl NotionRecords {
    pub fn new(client: NotionClient, database_id: &str, text_property: &str) -> Self {
        Self {
            database_id: database_id.to_string(),
            text_property: text_property.to_string(),
            client,
        }
    }

    pub fn from_settings(settings: &NotionSettings) -> Self {
        Self::new(
            NotionClient::from_settings(settings),
            &settings.database_id,
            &settings.text_property,
        )
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub async fn query_by_name(&self, name: &str) -> Result<Vec<PersonRecord>, NotionError> {
        self.query_by_field(schema::NAME, name).await
    }

    pub async fn query_by_email(&self, email: &str) -> Result<Vec<PersonRecord>, NotionError> {
        self.query_by_field(schema::EMAIL, email).await
    }

    fn create_request(&self, properties: Map<String, Value>) -> CreatePageRequest {
        CreatePageRequest {
            parent: DatabaseParent {
                database_id: self.database_id.clone(),
            },
            properties,
        }
    }

    async fn query(&self, filter: Option<Value>) -> Result<Vec<PersonRecord>, NotionError> {
        let req = QueryDatabaseRequest {
            filter,
            page_size: Some(QUERY_PAGE_SIZE),
        };
        let res = self.client.query_database(&self.database_id, &req).await?;
        if res.has_more {
            log::debug!(
                "database {} has more than {} pages; returning the first batch",
                self.database_id,
                QUERY_PAGE_SIZE
            );
        }
        Ok(res.results.iter().map(PersonRecord::from_page).collect())
    }
}

#[async_trait]
impl RecordStore for NotionRecords {
    async fn save_text(&self, text: &str) -> Result<(), NotionError> {
        let mut props = Map::new();
        props.insert(self.text_property.clone(), schema::title_value(text));
        let page = self.client.create_page(&self.create_request(props)).await?;
        log::debug!("created page {} in database {}", page.id, self.database_id);
        Ok(())
    }

    async fn add_record(&self, person: &NewPerson) -> Result<(), NotionError> {
        let req = self.create_request(person.to_properties());
        match self.client.create_page(&req).await {
            Ok(page) => {
                log::info!("page {} added to database {}", page.id, self.database_id);
                Ok(())
            }
            Err(e) => {
                log::warn!("creating page failed: {}", e);
                Err(e)
            }
        }
    }

    async fn query_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<PersonRecord>, NotionError> {
        let filter = schema::equals_filter(field, value)
            .ok_or_else(|| NotionError::UnsupportedFilter(field.to_string()))?;
        self.query(Some(filter)).await
    }

    async fn list_all(&self) -> Result<Vec<PersonRecord>, NotionError> {
        self.query(None).await
    }
}
