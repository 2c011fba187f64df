use crate::db::{list_tables, table_row_count, with_store};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::{Settings, REPORT_FILE, SUMMARY_FILE, TRANSFORMED_FILE, VALIDATION_FILE};

pub fn run(settings: &Settings) -> Result<()> {
    println!("Reference:  {}", settings.reference_dir.display());
    println!("Store:      {}", settings.store_path.display());
    println!("Output:     {}", settings.output_dir.display());
    println!("Threshold:  {}%", settings.threshold_pct);
    println!(
        "Retain intermediates: {}",
        if settings.retain_intermediates { "yes" } else { "no" }
    );

    if settings.store_path.exists() {
        let size = std::fs::metadata(&settings.store_path)?.len();
        println!("Store size: {}", format_bytes(size));

        let counts = with_store(&settings.store_path, |conn| {
            list_tables(conn)?
                .into_iter()
                .map(|t| table_row_count(conn, &t).map(|n| (t, n)))
                .collect::<Result<Vec<_>>>()
        })?;
        println!();
        for (table, rows) in counts {
            println!("{table:<16} {rows}");
        }
    } else {
        println!();
        println!("Store not found. Run `ledger-migrate init` to create it.");
    }

    println!();
    for name in [TRANSFORMED_FILE, VALIDATION_FILE, SUMMARY_FILE, REPORT_FILE] {
        let present = settings.output_path(name).exists();
        println!("{name:<16} {}", if present { "present" } else { "missing" });
    }
    Ok(())
}
