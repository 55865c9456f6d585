//! Stats command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(settings: Settings) -> Result<()> {
    let system = RagSystem::new(&settings)?;

    match system.get_course_analytics().await {
        Ok(analytics) => {
            if analytics.total_courses == 0 {
                Output::info("No courses indexed yet. Use 'pensum ingest <path>' to add content.");
            } else {
                Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
                println!();
                for title in &analytics.course_titles {
                    Output::list_item(title);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to load catalog statistics: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
