use crate::adapters::read_artifact;
use crate::domain::ports::CategoryEncoder;
use crate::utils::error::{Result, ServiceError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum EncoderFile {
    Classes(Vec<String>),
    Wrapped { classes: Vec<String> },
}

/// Fixed label set; a label's code is its position in the class list.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self> {
        if classes.is_empty() {
            return Err(ServiceError::artifact("label encoder", "class list is empty"));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (index, label) in classes.iter().enumerate() {
            if codes.insert(label.clone(), index as i64).is_some() {
                return Err(ServiceError::artifact(
                    "label encoder",
                    format!("duplicate class label: {}", label),
                ));
            }
        }

        Ok(Self { classes, codes })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_artifact(path.as_ref(), Self::from_json_str)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let classes = match serde_json::from_str::<EncoderFile>(content)? {
            EncoderFile::Classes(classes) | EncoderFile::Wrapped { classes } => classes,
        };
        Self::new(classes)
    }
}

impl CategoryEncoder for LabelEncoder {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn encode(&self, label: &str) -> Option<i64> {
        self.codes.get(label).copied()
    }
}
