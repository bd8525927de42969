//! Typed BigQuery audit log record and its decoder.
//!
//! Two layers, like the config module:
//! - `Raw*`: serde-friendly wire shape where every nested object is optional
//!   (absent key and explicit `null` are the same thing)
//! - `AuditRecord` and friends: normalized values that downstream code can
//!   read without presence checks
//!
//! Wire shape (only the keys we read):
//! {
//!   "resource": { "labels": { "project_id": "..." } },
//!   "protopayload_auditlog": {
//!     "methodName": "jobservice.jobcompleted",
//!     "authenticationInfo": { "principalEmail": "..." },
//!     "servicedata_v1_bigquery": {
//!       "jobCompletedEvent": {
//!         "eventName": "...",
//!         "job": {
//!           "jobConfiguration": { "load": {...}, "query": {...} },
//!           "jobStatistics": { "referencedTables": [...], "referencedViews": [...] }
//!         }
//!       }
//!     }
//!   }
//! }

use crate::auditlog::table::{RawTableRef, TableRef};
use crate::error::MalformedRecordError;
use serde::{Deserialize, Serialize};

static NO_TABLE: TableRef = TableRef {
    project: String::new(),
    dataset: String::new(),
    table: String::new(),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub project_label: String,
    pub method_name: String,
    pub auth_info: AuthInfo,
    /// None for audit methods that are not job completions.
    pub job_event: Option<JobEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthInfo {
    pub principal_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEvent {
    pub event_name: Option<String>,
    pub configuration: Option<JobConfiguration>,
    pub statistics: JobStatistics,
}

/// The active configuration kind of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobConfiguration {
    Load(LoadConfig),
    Query(QueryConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadConfig {
    pub source_uris: Vec<String>,
    pub destination_table: TableRef,
    pub create_disposition: Option<String>,
    pub write_disposition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryConfig {
    pub query: Option<String>,
    pub destination_table: TableRef,
    pub create_disposition: Option<String>,
    pub write_disposition: Option<String>,
}

/// Timestamps are kept as the exporter wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStatistics {
    pub create_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub referenced_tables: Vec<TableRef>,
    pub referenced_views: Vec<TableRef>,
}

impl JobConfiguration {
    pub fn destination_table(&self) -> &TableRef {
        match self {
            JobConfiguration::Load(load) => &load.destination_table,
            JobConfiguration::Query(query) => &query.destination_table,
        }
    }
}

impl JobEvent {
    /// Write target of the active configuration; an empty reference if the
    /// job carried no configuration.
    pub fn destination_table(&self) -> &TableRef {
        self.configuration
            .as_ref()
            .map(JobConfiguration::destination_table)
            .unwrap_or(&NO_TABLE)
    }

    /// Referenced tables followed by referenced views.
    pub fn sources(&self) -> impl Iterator<Item = &TableRef> {
        self.statistics
            .referenced_tables
            .iter()
            .chain(self.statistics.referenced_views.iter())
    }
}

/// Decode one exported log line.
/// Decode one exported line. Bytes that are not UTF-8 are malformed JSON.
pub fn decode(line: impl AsRef<[u8]>) -> Result<AuditRecord, MalformedRecordError> {
    let raw: RawAuditRecord = serde_json::from_slice(line.as_ref())?;
    AuditRecord::try_from(raw)
}

impl TryFrom<RawAuditRecord> for AuditRecord {
    type Error = MalformedRecordError;

    fn try_from(raw: RawAuditRecord) -> Result<Self, Self::Error> {
        let project_label = raw
            .resource
            .and_then(|r| r.labels)
            .and_then(|l| l.project_id)
            .ok_or(MalformedRecordError::MissingField("resource.labels.project_id"))?;

        let payload = raw
            .protopayload_auditlog
            .ok_or(MalformedRecordError::MissingField("protopayload_auditlog.methodName"))?;
        let method_name = payload
            .method_name
            .ok_or(MalformedRecordError::MissingField("protopayload_auditlog.methodName"))?;
        let principal_email = payload
            .authentication_info
            .and_then(|a| a.principal_email)
            .ok_or(MalformedRecordError::MissingField(
                "protopayload_auditlog.authenticationInfo.principalEmail",
            ))?;

        let job_event = payload
            .servicedata_v1_bigquery
            .and_then(|s| s.job_completed_event)
            .map(JobEvent::from);

        Ok(AuditRecord {
            project_label,
            method_name,
            auth_info: AuthInfo { principal_email },
            job_event,
        })
    }
}

impl From<RawJobCompletedEvent> for JobEvent {
    fn from(raw: RawJobCompletedEvent) -> Self {
        let (configuration, statistics) = match raw.job {
            Some(job) => (job.job_configuration, job.job_statistics),
            None => (None, None),
        };
        JobEvent {
            event_name: raw.event_name,
            configuration: configuration.and_then(RawJobConfiguration::into_active),
            statistics: statistics.map(JobStatistics::from).unwrap_or_default(),
        }
    }
}

impl RawJobConfiguration {
    // Query wins when both keys are present: it is the kind that carries
    // referenced tables.
    fn into_active(self) -> Option<JobConfiguration> {
        if let Some(query) = self.query {
            return Some(JobConfiguration::Query(QueryConfig {
                query: query.query,
                destination_table: query.destination_table.into(),
                create_disposition: query.create_disposition,
                write_disposition: query.write_disposition,
            }));
        }
        self.load.map(|load| {
            JobConfiguration::Load(LoadConfig {
                source_uris: load.source_uris.unwrap_or_default(),
                destination_table: load.destination_table.into(),
                create_disposition: load.create_disposition,
                write_disposition: load.write_disposition,
            })
        })
    }
}

impl From<RawJobStatistics> for JobStatistics {
    fn from(raw: RawJobStatistics) -> Self {
        JobStatistics {
            create_time: raw.create_time,
            start_time: raw.start_time,
            end_time: raw.end_time,
            referenced_tables: table_list(raw.referenced_tables),
            referenced_views: table_list(raw.referenced_views),
        }
    }
}

fn table_list(raw: Option<Vec<Option<RawTableRef>>>) -> Vec<TableRef> {
    raw.unwrap_or_default()
        .into_iter()
        .map(TableRef::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuditRecord {
    pub resource: Option<RawResource>,
    pub protopayload_auditlog: Option<RawProtopayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResource {
    pub labels: Option<RawResourceLabels>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResourceLabels {
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProtopayload {
    pub method_name: Option<String>,
    pub authentication_info: Option<RawAuthenticationInfo>,
    #[serde(rename = "servicedata_v1_bigquery")]
    pub servicedata_v1_bigquery: Option<RawServiceData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthenticationInfo {
    pub principal_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServiceData {
    pub job_completed_event: Option<RawJobCompletedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobCompletedEvent {
    pub event_name: Option<String>,
    pub job: Option<RawJob>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJob {
    pub job_configuration: Option<RawJobConfiguration>,
    pub job_statistics: Option<RawJobStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJobConfiguration {
    pub load: Option<RawLoadConfig>,
    pub query: Option<RawQueryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLoadConfig {
    pub source_uris: Option<Vec<String>>,
    pub destination_table: Option<RawTableRef>,
    pub create_disposition: Option<String>,
    pub write_disposition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQueryConfig {
    pub query: Option<String>,
    pub destination_table: Option<RawTableRef>,
    pub create_disposition: Option<String>,
    pub write_disposition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobStatistics {
    pub create_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub referenced_tables: Option<Vec<Option<RawTableRef>>>,
    pub referenced_views: Option<Vec<Option<RawTableRef>>>,
}
