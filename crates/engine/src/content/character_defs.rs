use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use roxmltree::Node;

use super::error::{
    error_at_node, parse_document, read_error, required_attribute, ContentError,
    ContentErrorCode,
};

/// Dialog script of one non-player character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterDef {
    pub id: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CharacterRoster {
    defs: BTreeMap<String, CharacterDef>,
}

impl CharacterRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: CharacterDef) {
        self.defs.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&CharacterDef> {
        self.defs.get(id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

pub fn load_character_roster(file_path: &Path) -> Result<CharacterRoster, ContentError> {
    let raw = fs::read_to_string(file_path).map_err(|source| read_error(file_path, source))?;
    parse_character_roster(file_path, &raw)
}

/// Decodes `<Characters>` of `<Character id>` elements, each holding one or
/// more `<Line>` children.
pub fn parse_character_roster(
    file_path: &Path,
    raw: &str,
) -> Result<CharacterRoster, ContentError> {
    let doc = parse_document(file_path, raw)?;
    let root = doc.root_element();
    if root.tag_name().name() != "Characters" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Characters>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut roster = CharacterRoster::new();
    for node in root.children().filter(Node::is_element) {
        if node.tag_name().name() != "Character" {
            return Err(error_at_node(
                ContentErrorCode::UnknownElement,
                format!("unsupported element <{}>", node.tag_name().name()),
                file_path,
                &doc,
                node,
            ));
        }
        let id = required_attribute(file_path, &doc, node, "id")?;
        if roster.get(id).is_some() {
            return Err(error_at_node(
                ContentErrorCode::DuplicateName,
                format!("character '{id}' is defined more than once"),
                file_path,
                &doc,
                node,
            ));
        }

        let mut lines = Vec::new();
        for line in node.children().filter(Node::is_element) {
            if line.tag_name().name() != "Line" {
                return Err(error_at_node(
                    ContentErrorCode::UnknownElement,
                    format!("unsupported element <{}> inside <Character>", line.tag_name().name()),
                    file_path,
                    &doc,
                    line,
                ));
            }
            let text = line.text().map(str::trim).unwrap_or_default();
            if text.is_empty() {
                return Err(error_at_node(
                    ContentErrorCode::InvalidValue,
                    "<Line> must not be empty".to_string(),
                    file_path,
                    &doc,
                    line,
                ));
            }
            lines.push(text.to_string());
        }
        if lines.is_empty() {
            return Err(error_at_node(
                ContentErrorCode::MissingElement,
                format!("character '{id}' needs at least one <Line>"),
                file_path,
                &doc,
                node,
            ));
        }

        roster.insert(CharacterDef {
            id: id.to_string(),
            lines,
        });
    }
    Ok(roster)
}
