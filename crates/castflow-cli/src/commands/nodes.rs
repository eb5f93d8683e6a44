use anyhow::{Result, anyhow};
use castflow_core::{FieldType, NodeRegistry, NodeSchema};
use colored::Colorize;

use crate::cli::NodesArgs;
use crate::output::table::{new_table, print_table};
use crate::output::{OutputFormat, json::print_json};

pub fn run(args: NodesArgs, registry: &NodeRegistry, format: OutputFormat) -> Result<()> {
    match args.node {
        Some(id) => {
            let schema = registry
                .get(&id)
                .map(|node| node.schema())
                .ok_or_else(|| anyhow!("node not found: {id}"))?;
            if format.is_json() {
                return print_json(&schema);
            }
            show(&schema)
        }
        None => {
            let schemas = registry.schemas();
            if format.is_json() {
                return print_json(&schemas);
            }
            list(&schemas)
        }
    }
}

fn list(schemas: &[NodeSchema]) -> Result<()> {
    let mut table = new_table(["ID", "Name", "Category", "Required inputs"]);
    for schema in schemas {
        let required: Vec<&str> = schema
            .inputs
            .iter()
            .filter(|field| field.required)
            .map(|field| field.key.as_str())
            .collect();
        table.add_row(vec![
            schema.id.clone(),
            schema.name.clone(),
            schema.category.clone(),
            required.join(", "),
        ]);
    }
    print_table(table)
}

fn show(schema: &NodeSchema) -> Result<()> {
    println!("{} ({})", schema.name.bold(), schema.id);
    println!("{}\n", schema.description);

    let mut table = new_table(["Input", "Type", "Required", "Default", "Description"]);
    for field in &schema.inputs {
        let kind = match field.field_type {
            FieldType::String if field.widget.is_some() => "file",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
        };
        table.add_row(vec![
            field.key.clone(),
            kind.to_string(),
            if field.required { "yes" } else { "no" }.to_string(),
            field
                .default
                .as_ref()
                .map(|value| value.to_string())
                .unwrap_or_default(),
            field.description.clone(),
        ]);
    }
    print_table(table)
}
