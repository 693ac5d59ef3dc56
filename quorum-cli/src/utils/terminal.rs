use std::io::{self, Write};

use cli_table::{print_stdout, Cell, Style, Table};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json;
use rst_common::with_tokio::tokio::task::spawn_blocking;

use prople_quorum_core::confirm::{ConfirmError, DecisionProvider, MemberTable, Summary};
use prople_quorum_core::notification::Notice;

const LOCAL_MARK: &str = "*";
const DISCARD_PROMPT: &str = "Delete event [Y|n]? ";

/// Empty answer, `y` or `Y` approves
pub fn approves(answer: &str) -> bool {
    matches!(answer.trim(), "" | "y" | "Y")
}

/// Only an explicit `y` or `Y` deletes
pub fn deletes(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

pub fn member_rows(table: &MemberTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                match row.local {
                    true => LOCAL_MARK.to_string(),
                    false => String::new(),
                },
                row.name.clone(),
                row.aid.clone(),
            ];

            if table.weighted {
                cells.push(row.threshold.clone().unwrap_or_default());
            }

            cells
        })
        .collect()
}

fn decision_error(err: impl ToString) -> ConfirmError {
    ConfirmError::Decision(err.to_string())
}

async fn ask(prompt: String) -> Result<String, ConfirmError> {
    spawn_blocking(move || -> Result<String, ConfirmError> {
        print!("{prompt}");
        io::stdout().flush().map_err(decision_error)?;

        let mut answer = String::new();
        let read = io::stdin().read_line(&mut answer).map_err(decision_error)?;
        if read == 0 {
            return Err(ConfirmError::Decision("stdin closed".to_string()));
        }

        Ok(answer)
    })
    .await
    .map_err(decision_error)?
}

async fn ask_non_empty(prompt: &str) -> Result<String, ConfirmError> {
    loop {
        let answer = ask(format!("{prompt}: ")).await?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

fn render_pairs(title: &str, pairs: &[(String, String)]) -> Result<(), ConfirmError> {
    if pairs.is_empty() {
        return Ok(());
    }

    println!("{title}:");
    for (name, value) in pairs {
        println!("    {name}: {value}");
    }

    Ok(())
}

fn render(summary: &Summary) -> Result<(), ConfirmError> {
    println!();
    println!("{}", summary.title);

    for table in summary.tables.iter() {
        let rows: Vec<Vec<_>> = member_rows(table)
            .into_iter()
            .map(|cells| cells.into_iter().map(|cell| cell.cell()).collect())
            .collect();

        let view = rows
            .table()
            .title(table.headers().into_iter().map(|header| header.cell().bold(true)));

        println!();
        println!("{}", table.title);
        print_stdout(view).map_err(decision_error)?;
    }

    render_pairs("Configuration", &summary.config)?;
    render_pairs("Details", &summary.fields)?;

    if let Some(data) = &summary.data {
        let pretty = serde_json::to_string_pretty(data).map_err(decision_error)?;
        println!("Data:");
        println!("{pretty}");
    }

    println!();
    Ok(())
}

/// Decisions answered by the operator on the controlling terminal
#[derive(Clone, Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DecisionProvider for Terminal {
    async fn approve(&self, summary: &Summary) -> Result<bool, ConfirmError> {
        render(summary)?;
        let answer = ask(format!("{} [Y|n]? ", summary.prompt)).await?;
        Ok(approves(&answer))
    }

    async fn alias(&self, prompt: &str) -> Result<String, ConfirmError> {
        ask_non_empty(prompt).await
    }

    async fn registry_name(&self, prompt: &str) -> Result<String, ConfirmError> {
        ask_non_empty(prompt).await
    }

    async fn discard(&self, notice: &Notice) -> Result<bool, ConfirmError> {
        println!(
            "Proposal {} ({}) is not complete",
            notice.id.as_ref(),
            notice.route().unwrap_or("unknown route")
        );

        let answer = ask(DISCARD_PROMPT.to_string()).await?;
        Ok(deletes(&answer))
    }

    async fn report(&self, message: &str) {
        println!("{message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prople_quorum_core::confirm::MemberRow;
    use table_test::table_test;

    #[test]
    fn test_approval_answers() {
        let table = vec![
            ("", true),
            ("\n", true),
            ("y\n", true),
            ("Y", true),
            ("n\n", false),
            ("N", false),
            ("yes", false),
        ];

        for (validator, input, expected) in table_test!(table) {
            let actual = approves(input);

            validator
                .given(&format!("answer {:?}", input))
                .when("asking for approval")
                .then(&format!("approved is {}", expected))
                .assert_eq(expected, actual);
        }
    }

    #[test]
    fn test_discard_answers() {
        let table = vec![
            ("", false),
            ("\n", false),
            ("y\n", true),
            ("Y", true),
            ("n", false),
        ];

        for (validator, input, expected) in table_test!(table) {
            let actual = deletes(input);

            validator
                .given(&format!("answer {:?}", input))
                .when("asking to delete")
                .then(&format!("deleted is {}", expected))
                .assert_eq(expected, actual);
        }
    }

    #[test]
    fn test_member_rows_weighted() {
        let table = MemberTable {
            title: "Signing Members".to_string(),
            weighted: true,
            rows: vec![
                MemberRow {
                    local: true,
                    name: "alice".to_string(),
                    aid: "Ealice".to_string(),
                    threshold: Some("1/2".to_string()),
                },
                MemberRow {
                    local: false,
                    name: "bob".to_string(),
                    aid: "Ebob".to_string(),
                    threshold: Some("1/2".to_string()),
                },
            ],
        };

        let rows = member_rows(&table);
        assert_eq!(rows[0], vec!["*", "alice", "Ealice", "1/2"]);
        assert_eq!(rows[1], vec!["", "bob", "Ebob", "1/2"]);
        assert_eq!(rows[0].len(), table.headers().len())
    }

    #[test]
    fn test_member_rows_unweighted() {
        let table = MemberTable {
            title: "Rotation Members".to_string(),
            weighted: false,
            rows: vec![MemberRow {
                local: false,
                name: "bob".to_string(),
                aid: "Ebob".to_string(),
                threshold: None,
            }],
        };

        assert_eq!(member_rows(&table), vec![vec!["", "bob", "Ebob"]])
    }
}
