use clap::Subcommand;
use serde_json::json;

use crate::api::CourseBackend;
use crate::cli::config::{api_client, open_session};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::error::ClientError;
use crate::types::CourseId;
use crate::viewer::Outline;

#[derive(Subcommand)]
pub enum CourseCommands {
    #[command(about = "Show course details")]
    Show {
        #[arg(help = "Course ID")]
        course: String,
    },

    #[command(about = "List modules and lessons in order")]
    Outline {
        #[arg(help = "Course ID")]
        course: String,
    },

    #[command(about = "Show enrollment progress")]
    Progress {
        #[arg(help = "Course ID")]
        course: String,
    },

    #[command(about = "Enroll in a course")]
    Enroll {
        #[arg(help = "Course ID")]
        course: String,
    },
}

pub async fn handle(cmd: CourseCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = open_session()?;
    let client = api_client(&session)?;

    match cmd {
        CourseCommands::Show { course } => {
            let course = client.course(&CourseId::from(course)).await?;

            match output_format {
                OutputFormat::Json => output_json(&course),
                OutputFormat::Text => {
                    println!("{}", course.title);
                    println!("{}", "=".repeat(course.title.chars().count()));
                    if let Some(description) = &course.description {
                        println!("{}\n", description);
                    }
                    println!("Teacher:  {}", course.teacher_name());
                    println!("Category: {}", course.category.as_deref().unwrap_or("-"));
                    println!("Level:    {}", course.level.as_deref().unwrap_or("-"));
                    println!("Rating:   {}/5", course.rating_average());
                    if !course.learning_outcomes.is_empty() {
                        println!("\nYou will learn:");
                        for outcome in &course.learning_outcomes {
                            println!("  ✓ {}", outcome);
                        }
                    }
                    if !course.requirements.is_empty() {
                        println!("\nRequirements:");
                        for requirement in &course.requirements {
                            println!("  • {}", requirement);
                        }
                    }
                    Ok(())
                }
            }
        }
        CourseCommands::Outline { course } => {
            let outline = Outline::new(client.course_modules(&CourseId::from(course)).await?);

            match output_format {
                OutputFormat::Json => output_json(&json!({ "modules": outline.modules() })),
                OutputFormat::Text => {
                    if outline.is_empty() {
                        println!("No modules yet");
                        return Ok(());
                    }
                    for (m, module) in outline.modules().iter().enumerate() {
                        println!("{}. {} ({} lessons)", m + 1, module.title, module.lessons.len());
                        for (l, lesson) in module.lessons.iter().enumerate() {
                            let duration = lesson
                                .duration
                                .map(|d| format!(" [{}m]", d))
                                .unwrap_or_default();
                            println!("   {}.{} {}{}", m + 1, l + 1, lesson.title, duration);
                        }
                    }
                    Ok(())
                }
            }
        }
        CourseCommands::Progress { course } => {
            match client.enrollment(&CourseId::from(course.as_str())).await {
                Ok(enrollment) => match output_format {
                    OutputFormat::Json => output_json(&enrollment),
                    OutputFormat::Text => {
                        let progress = &enrollment.progress;
                        println!(
                            "Progress: {} {} ({})",
                            progress.percentage_label(),
                            progress_bar(progress.completion_percentage, 20),
                            progress.count_label()
                        );
                        println!("Status: {:?}", enrollment.status);
                        Ok(())
                    }
                },
                Err(ClientError::NotEnrolled) => output_success(
                    &output_format,
                    &format!("Not enrolled in course {}", course),
                    Some(json!({ "enrolled": false })),
                ),
                Err(e) => Err(e.into()),
            }
        }
        CourseCommands::Enroll { course } => {
            let enrollment = client.enroll(&CourseId::from(course.as_str())).await?;
            output_success(
                &output_format,
                &format!("Enrolled in course {}", course),
                Some(json!({ "enrollment": enrollment })),
            )
        }
    }
}
