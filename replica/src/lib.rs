pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    clone_options_from_args, effective_depth, exit_code, expand_output_dir, parse_screen_size,
};

// Re-export clone functionality from replica-core
pub use replica_core::crawl::{CloneOptions, CloneProgressCallback, execute_clone, run_check};
pub use replica_core::report::{ReportFormat, generate_summary_report};
