/*
 *  Copyright 2026 Vigilance Authors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Collection payload mappers.
//!
//! Each monitoring-source type has a mapper that translates the source's
//! configuration into a [`CollectionInfo`] payload. The payload is the only
//! place source types are interpreted: the scheduler serializes it, stores
//! it, and hands it to the remote worker without ever matching on the
//! variant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::database::universal_types::{UniversalTimestamp, UniversalUuid};
use crate::models::time_series::MetricType;

/// Supported monitoring-source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    AppDynamics,
    Prometheus,
    Splunk,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::AppDynamics => "APP_DYNAMICS",
            SourceType::Prometheus => "PROMETHEUS",
            SourceType::Splunk => "SPLUNK",
        };
        f.write_str(name)
    }
}

/// One metric query definition for query-based sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub query: String,
}

/// Per-source-type configuration payload of a monitoring source.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    AppDynamics {
        application_name: String,
        tier_name: String,
        metric_pack: String,
    },
    Prometheus {
        metric_queries: Vec<MetricQuery>,
    },
    Splunk {
        query: String,
        host_field: Option<String>,
    },
}

/// A monitoring-source configuration, owned by the external config
/// service and consumed read-only here.
#[derive(Debug, Clone)]
pub struct MonitoringSourceConfig {
    pub id: UniversalUuid,
    pub account_id: String,
    pub identifier: String,
    pub connector_identifier: String,
    pub source_type: SourceType,
    pub enabled: bool,
    pub created_at: UniversalTimestamp,
    pub spec: SourceSpec,
}

/// The opaque payload shipped to the remote worker.
///
/// Serialized as internally tagged JSON; the worker dispatches on `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CollectionInfo {
    #[serde(rename_all = "camelCase")]
    AppDynamics {
        application_name: String,
        tier_name: String,
        metric_pack: String,
        connector_identifier: String,
    },
    #[serde(rename_all = "camelCase")]
    Prometheus {
        metric_queries: Vec<MetricQuery>,
        connector_identifier: String,
    },
    #[serde(rename_all = "camelCase")]
    Splunk {
        query: String,
        host_field: Option<String>,
        connector_identifier: String,
    },
}

/// Errors raised while building a collection payload.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("No mapper registered for source type {0}")]
    UnregisteredSourceType(SourceType),

    #[error("Config {config_id} declares source type {declared} but carries a different spec")]
    SpecMismatch {
        config_id: UniversalUuid,
        declared: SourceType,
    },
}

/// Translates a monitoring-source configuration into its collection
/// payload.
pub trait CollectionInfoMapper: Send + Sync {
    fn source_type(&self) -> SourceType;

    fn to_collection_info(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionInfo, MapperError>;
}

struct AppDynamicsMapper;

impl CollectionInfoMapper for AppDynamicsMapper {
    fn source_type(&self) -> SourceType {
        SourceType::AppDynamics
    }

    fn to_collection_info(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionInfo, MapperError> {
        match &config.spec {
            SourceSpec::AppDynamics {
                application_name,
                tier_name,
                metric_pack,
            } => Ok(CollectionInfo::AppDynamics {
                application_name: application_name.clone(),
                tier_name: tier_name.clone(),
                metric_pack: metric_pack.clone(),
                connector_identifier: config.connector_identifier.clone(),
            }),
            _ => Err(MapperError::SpecMismatch {
                config_id: config.id,
                declared: config.source_type,
            }),
        }
    }
}

struct PrometheusMapper;

impl CollectionInfoMapper for PrometheusMapper {
    fn source_type(&self) -> SourceType {
        SourceType::Prometheus
    }

    fn to_collection_info(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionInfo, MapperError> {
        match &config.spec {
            SourceSpec::Prometheus { metric_queries } => Ok(CollectionInfo::Prometheus {
                metric_queries: metric_queries.clone(),
                connector_identifier: config.connector_identifier.clone(),
            }),
            _ => Err(MapperError::SpecMismatch {
                config_id: config.id,
                declared: config.source_type,
            }),
        }
    }
}

struct SplunkMapper;

impl CollectionInfoMapper for SplunkMapper {
    fn source_type(&self) -> SourceType {
        SourceType::Splunk
    }

    fn to_collection_info(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionInfo, MapperError> {
        match &config.spec {
            SourceSpec::Splunk { query, host_field } => Ok(CollectionInfo::Splunk {
                query: query.clone(),
                host_field: host_field.clone(),
                connector_identifier: config.connector_identifier.clone(),
            }),
            _ => Err(MapperError::SpecMismatch {
                config_id: config.id,
                declared: config.source_type,
            }),
        }
    }
}

/// Registry of mappers keyed by source type.
pub struct MapperRegistry {
    mappers: HashMap<SourceType, Box<dyn CollectionInfoMapper>>,
}

impl MapperRegistry {
    /// Registry with the built-in mappers.
    pub fn with_defaults() -> Self {
        let mut registry = MapperRegistry {
            mappers: HashMap::new(),
        };
        registry.register(Box::new(AppDynamicsMapper));
        registry.register(Box::new(PrometheusMapper));
        registry.register(Box::new(SplunkMapper));
        registry
    }

    pub fn register(&mut self, mapper: Box<dyn CollectionInfoMapper>) {
        self.mappers.insert(mapper.source_type(), mapper);
    }

    /// Builds the payload for a config via its source type's mapper.
    pub fn to_collection_info(
        &self,
        config: &MonitoringSourceConfig,
    ) -> Result<CollectionInfo, MapperError> {
        self.mappers
            .get(&config.source_type)
            .ok_or(MapperError::UnregisteredSourceType(config.source_type))?
            .to_collection_info(config)
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("source_types", &self.mappers.keys().collect::<Vec<_>>())
            .finish()
    }
}
