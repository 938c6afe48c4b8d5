use relay_exec::Registry;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

pub async fn connectors_cmd(output: OutputArgs) -> i32 {
    let connectors = Registry::connectors();

    if output.format == OutputFormat::Text && !output.quiet {
        for c in &connectors {
            println!("{} {}", c.role, c.kind);
            for f in &c.schema.fields {
                let req = if f.required { "required" } else { "optional" };
                println!("  {} ({req}): {}", f.name, f.description);
            }
        }
    } else {
        print_result(output.format, output.quiet, &connectors);
    }
    exit_codes::SUCCESS
}
