//! DynamoDB record and glossary adapter.
//!
//! Meeting records live under the composite key `(meetingId, createdAt)`
//! with a `status-createdAt-index` GSI for duplicate detection. Items are
//! converted through `serde_json::Value`, so the attribute layout follows
//! the records' serde shapes exactly.
//!
//! Required IAM permissions:
//!   - dynamodb:GetItem, dynamodb:PutItem, dynamodb:UpdateItem
//!   - dynamodb:Query (table and index), dynamodb:Scan (glossary table)
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;

use crate::model::{GlossaryTerm, MeetingRecord, RecordKey, RecordUpdate, Status};
use crate::{Error, GlossaryStore, RecordStore};

/// Name of the `(status, createdAt)` secondary index.
const STATUS_INDEX: &str = "status-createdAt-index";

/// DynamoDB-backed [RecordStore] and [GlossaryStore].
pub struct DynamoRecordStore {
    client: Client,
    table: String,
    glossary_table: String,
}

impl DynamoRecordStore {
    /// Build the adapter for the meeting and glossary tables.
    pub fn new(conf: &SdkConfig, table: &str, glossary_table: &str) -> Self {
        DynamoRecordStore {
            client: Client::new(conf),
            table: table.to_string(),
            glossary_table: glossary_table.to_string(),
        }
    }
}

fn json_to_attr(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::Null => AttributeValue::Null(true),
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Number(n) => AttributeValue::N(n.to_string()),
        serde_json::Value::String(s) => AttributeValue::S(s),
        serde_json::Value::Array(items) => {
            AttributeValue::L(items.into_iter().map(json_to_attr).collect())
        }
        serde_json::Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(k, v)| (k, json_to_attr(v)))
                .collect(),
        ),
    }
}

fn attr_to_json(attr: &AttributeValue) -> serde_json::Value {
    match attr {
        AttributeValue::S(s) => serde_json::Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(serde_json::Value::from)
            .or_else(|_| n.parse::<f64>().map(serde_json::Value::from))
            .unwrap_or(serde_json::Value::Null),
        AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
        AttributeValue::Null(_) => serde_json::Value::Null,
        AttributeValue::L(items) => {
            serde_json::Value::Array(items.iter().map(attr_to_json).collect())
        }
        AttributeValue::M(map) => serde_json::Value::Object(
            map.iter().map(|(k, v)| (k.clone(), attr_to_json(v))).collect(),
        ),
        AttributeValue::Ss(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|s| serde_json::Value::String(s.clone()))
                .collect(),
        ),
        _ => serde_json::Value::Null,
    }
}

fn to_item<T: serde::Serialize>(value: &T) -> Result<HashMap<String, AttributeValue>, Error> {
    match json_to_attr(serde_json::to_value(value)?) {
        AttributeValue::M(map) => Ok(map),
        _ => Err(Error::RecordError("record did not serialize to a map".into())),
    }
}

fn from_item<T: serde::de::DeserializeOwned>(
    item: &HashMap<String, AttributeValue>,
) -> Result<T, Error> {
    let json = serde_json::Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), attr_to_json(v)))
            .collect(),
    );
    Ok(serde_json::from_value(json)?)
}

impl DynamoRecordStore {
    async fn query_one(
        &self,
        builder: aws_sdk_dynamodb::operation::query::builders::QueryFluentBuilder,
    ) -> Result<Option<MeetingRecord>, Error> {
        let output = builder
            .limit(1)
            .send()
            .await
            .map_err(|e| Error::RecordError(format!("{}", DisplayErrorContext(e))))?;

        match output.items().first() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<MeetingRecord>, Error> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("meetingId", AttributeValue::S(key.meeting_id.clone()))
            .key("createdAt", AttributeValue::S(key.created_at.clone()))
            .send()
            .await
            .map_err(|e| Error::RecordError(format!("{}", DisplayErrorContext(e))))?;

        match output.item() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<MeetingRecord>, Error> {
        let builder = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("meetingId = :id")
            .expression_attribute_values(":id", AttributeValue::S(meeting_id.to_string()))
            .scan_index_forward(false);
        self.query_one(builder).await
    }

    async fn find_by_status(
        &self,
        status: Status,
        s3_key: &str,
    ) -> Result<Option<MeetingRecord>, Error> {
        let builder = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(STATUS_INDEX)
            .key_condition_expression("#status = :status")
            .filter_expression("s3Key = :key")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", AttributeValue::S(status.as_str().into()))
            .expression_attribute_values(":key", AttributeValue::S(s3_key.to_string()));
        self.query_one(builder).await
    }

    async fn put(&self, record: &MeetingRecord) -> Result<(), Error> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(record)?))
            .send()
            .await
            .map_err(|e| Error::RecordError(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }

    async fn update(&self, key: &RecordKey, update: RecordUpdate) -> Result<(), Error> {
        let mut sets: Vec<String> = Vec::new();
        let mut removes: Vec<String> = Vec::new();
        let mut names: HashMap<String, String> = HashMap::new();
        let mut values: HashMap<String, AttributeValue> = HashMap::new();

        if let Some(status) = update.status {
            sets.push("#status = :status".into());
            let _ = names.insert("#status".into(), "status".into());
            let _ = values.insert(":status".into(), AttributeValue::S(status.as_str().into()));
        }
        if let Some(stage) = update.stage {
            sets.push("#stage = :stage".into());
            let _ = names.insert("#stage".into(), "stage".into());
            let _ = values.insert(":stage".into(), AttributeValue::S(stage.as_str().into()));
        }

        let fields = [
            ("transcribeKey", &update.transcribe_key),
            ("whisperKey", &update.whisper_key),
            ("funasrKey", &update.funasr_key),
            ("reportKey", &update.report_key),
            ("pdfKey", &update.pdf_key),
            ("updatedAt", &update.updated_at),
            ("exportedAt", &update.exported_at),
        ];
        for (attr, value) in fields {
            if let Some(value) = value {
                sets.push(format!("{attr} = :{attr}"));
                let _ = values.insert(format!(":{attr}"), AttributeValue::S(value.clone()));
            }
        }

        match &update.error_message {
            Some(Some(message)) => {
                sets.push("errorMessage = :errorMessage".into());
                let _ = values.insert(
                    ":errorMessage".into(),
                    AttributeValue::S(message.clone()),
                );
            }
            Some(None) => removes.push("errorMessage".into()),
            None => {}
        }

        let mut expression = String::new();
        if !sets.is_empty() {
            expression.push_str("SET ");
            expression.push_str(&sets.join(", "));
        }
        if !removes.is_empty() {
            if !expression.is_empty() {
                expression.push(' ');
            }
            expression.push_str("REMOVE ");
            expression.push_str(&removes.join(", "));
        }

        let mut condition = String::from("attribute_exists(meetingId)");
        if let Some(expected) = update.expect_status {
            condition.push_str(" AND #status = :expectedStatus");
            let _ = names.insert("#status".into(), "status".into());
            let _ = values.insert(
                ":expectedStatus".into(),
                AttributeValue::S(expected.as_str().into()),
            );
        }

        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("meetingId", AttributeValue::S(key.meeting_id.clone()))
            .key("createdAt", AttributeValue::S(key.created_at.clone()))
            .update_expression(expression)
            .condition_expression(condition)
            .set_expression_attribute_names((!names.is_empty()).then_some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service = e.into_service_error();
                if service.is_conditional_check_failed_exception() {
                    if update.expect_status.is_some() {
                        Err(Error::ConditionFailed)
                    } else {
                        Err(Error::RecordNotFound(key.meeting_id.clone()))
                    }
                } else {
                    Err(Error::RecordError(format!("{}", service)))
                }
            }
        }
    }
}

#[async_trait]
impl GlossaryStore for DynamoRecordStore {
    async fn scan_terms(&self) -> Result<Vec<GlossaryTerm>, Error> {
        let mut terms = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.glossary_table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| Error::RecordError(format!("{}", DisplayErrorContext(e))))?;

            for item in output.items() {
                terms.push(from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(terms)
    }
}
