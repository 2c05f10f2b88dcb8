// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! PL/pgSQL maintenance triggers.
//!
//! Single-table vectors get one `BEFORE` trigger that assigns
//! `NEW.<vector>` directly. Cross-table vectors get one `AFTER` trigger per
//! contributing table, each re-running the owning table's vector update for
//! the affected row.

use super::expression::{VectorExpressionBuilder, NEW_ROW};
use crate::spec::VectorSpec;
use crate::sql::{Ddl, Predicate, Statement, TriggerTiming};

/// One trigger function plus the trigger that invokes it
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceTrigger {
    /// Table the trigger fires on
    pub table_name: String,
    pub timing: TriggerTiming,
    /// Columns whose change on UPDATE refreshes the vector
    pub watched_columns: Vec<String>,
    /// PL/pgSQL statement run when the trigger fires, including the `;`
    pub update_statement: String,
    pub function_name: String,
    pub trigger_name: String,
}

impl MaintenanceTrigger {
    fn new(
        spec: &VectorSpec,
        table_name: &str,
        timing: TriggerTiming,
        watched_columns: Vec<String>,
        update_statement: String,
    ) -> Self {
        let function_name = format!("tsearch_{}_{}_for_{}", spec.table, spec.name, table_name);
        Self {
            table_name: table_name.to_string(),
            timing,
            watched_columns,
            update_statement,
            trigger_name: format!("t_{}", function_name),
            function_name,
        }
    }

    /// Function body between the dollar quotes.
    pub fn function_body(&self) -> String {
        let mut body = String::from("BEGIN\n");
        body.push_str("  IF TG_OP = 'INSERT' THEN\n");
        body.push_str(&format!("    {}\n", self.update_statement));

        if !self.watched_columns.is_empty() {
            let changed = self
                .watched_columns
                .iter()
                .map(|c| format!("NEW.{c} IS DISTINCT FROM OLD.{c}"))
                .collect::<Vec<_>>()
                .join(" OR ");
            body.push_str("  ELSIF TG_OP = 'UPDATE' THEN\n");
            body.push_str(&format!("    IF ({}) THEN\n", changed));
            body.push_str(&format!("      {}\n", self.update_statement));
            body.push_str("    END IF;\n");
        }

        body.push_str("  END IF;\n");
        body.push_str("  RETURN NEW;\n");
        body.push_str("END;");
        body
    }

    /// Install statements in order: function, drop old trigger, create trigger.
    pub fn statements(&self) -> Vec<Ddl> {
        vec![
            Ddl::CreateFunction {
                name: self.function_name.clone(),
                body: self.function_body(),
            },
            Ddl::DropTrigger {
                name: self.trigger_name.clone(),
                table: self.table_name.clone(),
            },
            Ddl::CreateTrigger {
                name: self.trigger_name.clone(),
                table: self.table_name.clone(),
                timing: self.timing,
                function: self.function_name.clone(),
            },
        ]
    }
}

/// Generates the triggers keeping a vector current
pub struct TriggerGenerator;

impl TriggerGenerator {
    pub fn generate(spec: &VectorSpec) -> Vec<MaintenanceTrigger> {
        if spec.is_multi_table() {
            Self::cross_table(spec)
        } else {
            vec![Self::single_table(spec)]
        }
    }

    fn single_table(spec: &VectorSpec) -> MaintenanceTrigger {
        let watched = spec
            .columns_by_table()
            .into_iter()
            .find(|(table, _)| table == &spec.table)
            .map(|(_, columns)| columns)
            .unwrap_or_default();
        let assignment = format!(
            "{}{} := {};",
            NEW_ROW,
            spec.name,
            VectorExpressionBuilder::build(spec, Some(NEW_ROW))
        );
        MaintenanceTrigger::new(spec, &spec.table, TriggerTiming::Before, watched, assignment)
    }

    fn cross_table(spec: &VectorSpec) -> Vec<MaintenanceTrigger> {
        let mut tables = spec.columns_by_table();
        if !tables.iter().any(|(table, _)| table == &spec.table) {
            tables.push((spec.table.clone(), Vec::new()));
        }

        tables
            .into_iter()
            .map(|(table, watched)| {
                let row = Predicate::raw(format!(
                    "{}.{pk} = NEW.{pk}",
                    table,
                    pk = spec.primary_key
                ));
                let update = VectorExpressionBuilder::update(spec, Some(row));
                // No placeholders: the update carries no bound values.
                let statement = format!("{};", Statement::from(update).to_sql().sql);
                MaintenanceTrigger::new(spec, &table, TriggerTiming::After, watched, statement)
            })
            .collect()
    }
}
