use log::{debug, info};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::error::{Result, RuntimeError};
use super::Session;
use crate::tensor::{Numeric, Tensor};

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// On-disk form of a set of variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Numeric")]
pub struct Checkpoint<T: Numeric> {
    pub format_version: u32,
    pub variables: BTreeMap<String, Tensor<T>>,
}

/// Writes and restores session variables as JSON checkpoints.
///
/// By default every variable of the session is covered; [`Saver::with_var_list`] narrows
/// that to the named ones.
#[derive(Debug, Clone, Default)]
pub struct Saver {
    var_list: Option<Vec<String>>,
}

impl Saver {
    pub fn new() -> Saver {
        Saver::default()
    }

    pub fn with_var_list<I, S>(names: I) -> Saver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Saver {
            var_list: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    fn covered<T: Numeric, S: Session<T> + ?Sized>(&self, sess: &S) -> Vec<String> {
        match &self.var_list {
            Some(names) => names.clone(),
            None => sess.variable_names(),
        }
    }

    pub fn save<T, S>(&self, sess: &S, path: impl AsRef<Path>) -> Result<()>
    where
        T: Numeric,
        S: Session<T> + ?Sized,
    {
        let path = path.as_ref();
        let mut values: BTreeMap<String, Tensor<T>> = sess.variables().into_iter().collect();
        let mut variables = BTreeMap::new();
        for name in self.covered::<T, S>(sess) {
            let value = values
                .remove(&name)
                .ok_or_else(|| RuntimeError::UninitializedVariable(name.clone()))?;
            variables.insert(name, value);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let checkpoint = Checkpoint {
            format_version: CHECKPOINT_FORMAT_VERSION,
            variables,
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &checkpoint)?;
        writer.flush()?;
        info!(
            "saved {} variables to {}",
            checkpoint.variables.len(),
            path.display()
        );
        Ok(())
    }

    pub fn restore<T, S>(&self, sess: &mut S, path: impl AsRef<Path>) -> Result<()>
    where
        T: Numeric,
        S: Session<T> + ?Sized,
    {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut checkpoint: Checkpoint<T> = serde_json::from_reader(reader)?;
        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(RuntimeError::CheckpointVersion(checkpoint.format_version));
        }

        // Nothing is assigned until every covered variable is known to restore cleanly.
        let names = self.covered::<T, S>(sess);
        for name in &names {
            let value = checkpoint
                .variables
                .get(name)
                .ok_or_else(|| RuntimeError::MissingVariable(name.clone()))?;
            let shape = sess
                .variable_shape(name)
                .ok_or_else(|| RuntimeError::UnknownVariable(name.clone()))?;
            if value.shape() != shape.as_slice() {
                return Err(RuntimeError::VariableShape {
                    name: name.clone(),
                    expected: shape,
                    got: value.shape().to_vec(),
                });
            }
        }
        for name in &names {
            if let Some(value) = checkpoint.variables.remove(name) {
                sess.assign(name, value)?;
            }
        }
        if !checkpoint.variables.is_empty() {
            debug!(
                "ignored {} checkpoint variables unknown to the saver",
                checkpoint.variables.len()
            );
        }
        info!("restored {} variables from {}", names.len(), path.display());
        Ok(())
    }
}
