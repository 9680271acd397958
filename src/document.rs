//! Grammar documents: a host graph together with the rules that rewrite it, stored as YAML.
//!
//! Loading validates the whole document before handing it out. Saving goes through a
//! temporary file next to the destination, so the destination is either the old file or
//! the complete new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::grammar::validate::{validate_graph, validate_layer_order, validate_rules, ValidationError};
use crate::grammar::{HostGraph, Rule, TypeSet};
use crate::transform::TransformationOptions;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("could not parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{path:?} is not a valid grammar: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not write {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("could not serialize the grammar: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("could not replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

/// A graph grammar: declared types, the host graph, the rules and how to run them.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GrammarDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Where the document was loaded from. Empty for documents built in memory.
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "TypeSet::is_empty")]
    pub types: TypeSet,
    pub graph: HostGraph,
    #[serde(default)]
    pub options: TransformationOptions,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl PartialEq for GrammarDocument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.types == other.types
            && self.graph == other.graph
            && self.options == other.options
            && self.rules == other.rules
    }
}

impl GrammarDocument {
    pub fn new(name: &str, graph: HostGraph, rules: Vec<Rule>) -> Self {
        Self {
            name: name.to_string(),
            version: None,
            path: PathBuf::new(),
            types: TypeSet::default(),
            graph,
            options: TransformationOptions::default(),
            rules,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document: GrammarDocument =
            serde_yaml::from_str(&contents).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        document.validate().map_err(|source| LoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        document.path = path.to_path_buf();
        log::debug!(
            "Loaded grammar {} from {:?}: {} nodes, {} edges, {} rules",
            document.name,
            path,
            document.graph.order(),
            document.graph.size(),
            document.rules.len()
        );
        Ok(document)
    }

    /// Check rules, host graph and options against each other and the declared types.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_rules(&self.rules, &self.types)?;
        validate_graph(&self.graph, &self.types)?;
        if let Some(order) = &self.options.layer_order {
            validate_layer_order(order)?;
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        let path = path.as_ref();
        let io_error = |source: io::Error| SaveError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
        serde_yaml::to_writer(&mut file, self)?;
        file.flush().map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(path).map_err(|source| SaveError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Saved grammar {} to {:?}", self.name, path);
        Ok(())
    }

    /// Write the document back to where it was loaded from.
    pub fn save_in_place(&self) -> Result<(), SaveError> {
        self.save(&self.path)
    }
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<GrammarDocument, LoadError> {
    GrammarDocument::load(path)
}

pub fn save<P: AsRef<Path>>(document: &GrammarDocument, path: P) -> Result<(), SaveError> {
    document.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Node, Procedure, Value};

    const GRAMMAR: &str = r#"
name: pruning
version: "1.2"
types:
  nodes:
    - name: tip
      attributes:
        marked: bool
        weight: float
    - name: stem
  edges:
    - name: bears
graph:
  nodes:
    - id: 0
      type: stem
    - id: 1
      type: tip
      attributes:
        marked: true
        weight: 0.5
    - id: 4
      type: tip
      attributes:
        marked: false
        weight: 2
  edges:
    - id: 0
      source: 0
      target: 1
      type: bears
    - source: 0
      target: 4
      type: bears
options:
  max_steps: 100
rules:
  - name: prune
    from:
      nodes:
        - id: 0
          type: tip
          attributes:
            marked: [eq, true]
    to:
      - delete: 0
  - name: sprout
    layer: 1
    enabled: false
    from:
      nodes:
        - id: 0
          type: stem
    to:
      - add:
          id: 1
          node:
            type: tip
      - connect:
          source: 0
          target: 1
          type: bears
"#;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "pruning.yaml", GRAMMAR);
        let document = load(&path).unwrap();

        assert_eq!(document.name, "pruning");
        assert_eq!(document.version.as_deref(), Some("1.2"));
        assert_eq!(document.path, path);
        assert_eq!(document.graph.order(), 3);
        assert_eq!(document.graph.size(), 2);
        assert_eq!(
            document.graph.node(1).unwrap().attributes["weight"],
            Value::Float(0.5)
        );
        assert_eq!(document.options.max_steps, Some(100));
        assert_eq!(document.rules.len(), 2);
        assert!(!document.rules[1].enabled);
        assert_eq!(document.rules[1].layer, 1);
        assert!(matches!(document.rules[0].to[0], Procedure::Delete(_)));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "in.yaml", GRAMMAR);
        let destination = dir.path().join("out.yaml");

        let document = load(&source).unwrap();
        save(&document, &destination).unwrap();
        let reloaded = load(&destination).unwrap();
        assert_eq!(document, reloaded);
        assert_eq!(reloaded.path, destination);
    }

    #[test]
    fn test_round_trip_in_memory_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = HostGraph::new();
        let a = graph.add_node(Node::new("a").with_attribute("label", "first")).unwrap();
        let b = graph.add_node(Node::new("b").with_attribute("count", 3)).unwrap();
        graph.add_edge(a, b, "next").unwrap();
        graph.add_edge(a, b, "next").unwrap();
        graph.remove_node(a);
        graph.add_node(Node::new("c")).unwrap();
        let document = GrammarDocument::new("scratch", graph, vec![]);

        let path = dir.path().join("scratch.yaml");
        document.save(&path).unwrap();
        assert_eq!(load(&path).unwrap(), document);
    }

    #[test]
    fn test_save_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "pruning.yaml", GRAMMAR);
        let mut document = load(&path).unwrap();
        document.graph.remove_node(1);
        document.save_in_place().unwrap();
        assert_eq!(load(&path).unwrap().graph.order(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(dir.path().join("nothing.yaml"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.yaml", "name: [unclosed\ngraph: {");
        assert!(matches!(load(&path), Err(LoadError::Parse { .. })));

        let path = write(dir.path(), "no_graph.yaml", "name: empty\nrules: []\n");
        assert!(matches!(load(&path), Err(LoadError::Parse { .. })));

        let path = write(
            dir.path(),
            "dangling.yaml",
            "name: dangling\ngraph:\n  nodes: []\n  edges:\n    - source: 0\n      target: 1\n      type: x\n",
        );
        assert!(matches!(load(&path), Err(LoadError::Parse { .. })));

        let path = write(
            dir.path(),
            "huge_id.yaml",
            "name: huge\ngraph:\n  nodes:\n    - id: 18446744073709551615\n      type: x\n",
        );
        assert!(matches!(load(&path), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn test_load_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let broken = GRAMMAR.replace("- delete: 0", "- delete: 7");
        let path = write(dir.path(), "broken.yaml", &broken);
        match load(&path) {
            Err(LoadError::Invalid { source, .. }) => assert_eq!(
                source,
                ValidationError::UnknownNode {
                    rule: "prune".to_string(),
                    id: 7
                }
            ),
            other => panic!("Expected an invalid document, got {:?}", other),
        }

        let untyped = GRAMMAR.replace("type: bears", "type: holds");
        let path = write(dir.path(), "untyped.yaml", &untyped);
        assert!(matches!(load(&path), Err(LoadError::Invalid { .. })));
    }

    #[test]
    fn test_failed_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let document = GrammarDocument::new("lost", HostGraph::new(), vec![]);
        let destination = dir.path().join("missing").join("out.yaml");
        assert!(matches!(
            document.save(&destination),
            Err(SaveError::Io { .. })
        ));
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "out.yaml", "old contents");
        let document = GrammarDocument::new("fresh", HostGraph::new(), vec![]);
        document.save(&path).unwrap();
        assert_eq!(load(&path).unwrap().name, "fresh");
        // Only the destination remains, no temporary files.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
