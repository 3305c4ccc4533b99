use crate::support::{EXIT_CLEAN, print_json, yes_no};
use metasync_kernel::ContractRegistry;

pub fn run(json_output: bool) -> i32 {
    let summaries = ContractRegistry::builtin().summaries();

    if json_output {
        print_json(&summaries);
        return EXIT_CLEAN;
    }

    println!("metasync contracts");
    for summary in &summaries {
        let fields = if summary.required_fields.is_empty() {
            "-".to_string()
        } else {
            summary.required_fields.join(", ")
        };
        println!(
            "  {:<28} required: {:<12} graph node: {}",
            summary.kind.as_str(),
            fields,
            yes_no(summary.declares_dependencies)
        );
    }
    EXIT_CLEAN
}
