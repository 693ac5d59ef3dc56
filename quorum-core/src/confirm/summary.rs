use rst_common::standard::serde_json::Value;

use crate::codec::types::{traits, CodecError, Ked};
use crate::codec::Tholder;
use crate::group::Hab;

pub const UNKNOWN_PARTICIPANT: &str = "Unknown Participant";
pub const UNKNOWN_DELEGATOR: &str = "Unknown Delegator";

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRow {
    pub local: bool,
    pub name: String,
    pub aid: String,

    /// Weight of the member, only for weighted thresholds
    pub threshold: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberTable {
    pub title: String,
    pub weighted: bool,
    pub rows: Vec<MemberRow>,
}

impl MemberTable {
    /// One row per member in `mids` order, `aliases` is aligned with `mids`
    pub fn build(
        title: &str,
        mids: &[String],
        local: &Hab,
        aliases: &[Option<String>],
        tholder: &Tholder,
    ) -> Self {
        let weights = tholder.weights();
        let rows = mids
            .iter()
            .enumerate()
            .map(|(idx, mid)| {
                let local_member = *mid == local.pre;
                let name = match local_member {
                    true => local.name.clone(),
                    false => aliases
                        .get(idx)
                        .cloned()
                        .flatten()
                        .unwrap_or(UNKNOWN_PARTICIPANT.to_string()),
                };

                MemberRow {
                    local: local_member,
                    name,
                    aid: mid.clone(),
                    threshold: match tholder.weighted() {
                        true => weights.get(idx).cloned(),
                        false => None,
                    },
                }
            })
            .collect();

        Self {
            title: title.to_string(),
            weighted: tholder.weighted(),
            rows,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        match self.weighted {
            true => vec!["Local", "Name", "AID", "Threshold"],
            false => vec!["Local", "Name", "AID"],
        }
    }
}

/// Structured description of a proposal shown to the operator before approval
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub title: String,

    /// Question asked when approving, `Join` or `Approve` for instance
    pub prompt: String,
    pub tables: Vec<MemberTable>,
    pub config: Vec<(String, String)>,
    pub fields: Vec<(String, String)>,
    pub data: Option<Value>,
}

impl Summary {
    pub fn new(title: &str, prompt: &str) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: MemberTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_config(mut self, rows: Vec<(String, String)>) -> Self {
        self.config.extend(rows);
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Display form of a known or unknown identifier, `alias (pre)`
pub fn labelled(alias: Option<&str>, pre: &str, fallback: &str) -> String {
    format!("{} ({pre})", alias.unwrap_or(fallback))
}

fn text(ked: &Ked, label: &str) -> String {
    match ked.get(label) {
        Some(Value::String(val)) => val.clone(),
        Some(val) => val.to_string(),
        None => String::new(),
    }
}

fn list(ked: &Ked, label: &str) -> Vec<String> {
    ked.get(label)
        .and_then(|val| val.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|item| item.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn has_trait(ked: &Ked, name: &str) -> bool {
    list(ked, "c").iter().any(|cnfg| cnfg == name)
}

fn common_rows(ked: &Ked, delegator: Option<&str>) -> Result<Vec<(String, String)>, CodecError> {
    let mut rows = Vec::new();
    if let Some(di) = ked.get("di").and_then(|val| val.as_str()) {
        rows.push((
            "Delegator".to_string(),
            labelled(delegator, di, UNKNOWN_DELEGATOR),
        ));
    }

    let tholder = Tholder::new(ked.get("kt").unwrap_or(&Value::Null))?;
    if let Some(num) = tholder.num() {
        rows.push(("Signature Threshold".to_string(), num.to_string()));
    }

    Ok(rows)
}

/// Configuration rows of a proposed inception event
pub fn inception_config(
    ked: &Ked,
    delegator: Option<&str>,
) -> Result<Vec<(String, String)>, CodecError> {
    let mut rows = common_rows(ked, delegator)?;
    rows.push((
        "Establishment Only".to_string(),
        has_trait(ked, traits::ESTABLISHMENT_ONLY).to_string(),
    ));
    rows.push((
        "Do Not Delegate".to_string(),
        has_trait(ked, traits::DO_NOT_DELEGATE).to_string(),
    ));
    rows.push(("Witness Threshold".to_string(), text(ked, "bt")));
    rows.push(("Witnesses".to_string(), list(ked, "b").join("\n")));
    Ok(rows)
}

/// Configuration rows of a proposed rotation event
pub fn rotation_config(
    ked: &Ked,
    delegator: Option<&str>,
) -> Result<Vec<(String, String)>, CodecError> {
    let mut rows = common_rows(ked, delegator)?;
    rows.push(("Witness Threshold".to_string(), text(ked, "bt")));

    let added = list(ked, "ba");
    if !added.is_empty() {
        rows.push(("Added Witnesses".to_string(), added.join("\n")));
    }

    let removed = list(ked, "br");
    if !removed.is_empty() {
        rows.push(("Removed Witnesses".to_string(), removed.join("\n")));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    fn ked(value: Value) -> Ked {
        match value {
            Value::Object(map) => map,
            _ => Ked::new(),
        }
    }

    fn mids() -> Vec<String> {
        vec!["EA".to_string(), "EB".to_string(), "EC".to_string()]
    }

    #[test]
    fn test_member_table_simple_threshold() {
        let local = Hab::new("alice", "EA");
        let tholder = Tholder::new(&json!("2")).unwrap();
        let aliases = vec![None, Some("bob".to_string()), None];

        let table = MemberTable::build("Participants", &mids(), &local, &aliases, &tholder);
        assert_eq!(table.headers(), vec!["Local", "Name", "AID"]);
        assert!(table.rows[0].local);
        assert_eq!(table.rows[0].name, "alice");
        assert_eq!(table.rows[1].name, "bob");
        assert_eq!(table.rows[2].name, UNKNOWN_PARTICIPANT);
        assert!(table.rows.iter().all(|row| row.threshold.is_none()));
    }

    #[test]
    fn test_member_table_weighted_threshold() {
        let local = Hab::new("bob", "EB");
        let tholder = Tholder::new(&json!(["1/2", "1/2", "1/2"])).unwrap();

        let table = MemberTable::build("Signing Members", &mids(), &local, &[], &tholder);
        assert_eq!(table.headers().len(), 4);
        assert!(table.rows[1].local);
        assert_eq!(table.rows[2].threshold, Some("1/2".to_string()));
    }

    #[test]
    fn test_inception_config_rows() {
        let rows = inception_config(
            &ked(json!({
                "kt": "2",
                "c": ["EO"],
                "bt": "1",
                "b": ["BW1", "BW2"],
                "di": "EDel"
            })),
            None,
        )
        .unwrap();

        let names: Vec<&str> = rows.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Delegator",
                "Signature Threshold",
                "Establishment Only",
                "Do Not Delegate",
                "Witness Threshold",
                "Witnesses"
            ]
        );

        assert_eq!(rows[0].1, "Unknown Delegator (EDel)");
        assert_eq!(rows[2].1, "true");
        assert_eq!(rows[3].1, "false");
        assert_eq!(rows[5].1, "BW1\nBW2");
    }

    #[test]
    fn test_rotation_config_skips_empty_witness_changes() {
        let rows = rotation_config(
            &ked(json!({"kt": ["1/2", "1/2"], "bt": "0", "ba": [], "br": ["BW1"]})),
            None,
        )
        .unwrap();

        let names: Vec<&str> = rows.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Witness Threshold", "Removed Witnesses"]);
    }
}
