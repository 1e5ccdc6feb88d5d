use serde::{Deserialize, Serialize};

/// A named feature version a workflow execution can be gated on, so new
/// behavior can be introduced without breaking replay of older histories
/// (§4.I, glossary "Version gate").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureVersion {
    MemoryRetrievalV1,
    ContextCompressV1,
    GapFillingV1,
    RecruitV1,
    RetireV1,
}

impl FeatureVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureVersion::MemoryRetrievalV1 => "memory_retrieval_v1",
            FeatureVersion::ContextCompressV1 => "context_compress_v1",
            FeatureVersion::GapFillingV1 => "gap_filling_v1",
            FeatureVersion::RecruitV1 => "recruit_v1",
            FeatureVersion::RetireV1 => "retire_v1",
        }
    }
}
