use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{ApiClient, CourseBackend};
use crate::cli::config::{api_client, open_session};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::error::ClientError;
use crate::types::CourseId;
use crate::viewer::{CompletionOutcome, CourseViewer, EnrollOutcome, ViewPhase};

const HELP: &str = "\
Commands:
  next | n            go to the next lesson
  prev | p            go to the previous lesson
  module <N>          open module N
  lesson <N>          open lesson N of the current module
  play                start the video (completes after continuous play)
  pause               pause the video
  complete | done     mark the current lesson complete
  enroll              enroll in this course
  outline             show all modules and lessons
  reload              fetch the course content again
  status              show progress and the current lesson
  help                show this help
  quit | q            leave the viewer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Previous,
    Module(usize),
    Lesson(usize),
    Play,
    Pause,
    Complete,
    Enroll,
    Outline,
    Reload,
    Status,
    Help,
    Quit,
}

impl FromStr for ViewerCommand {
    type Err = String;

    /// Module and lesson numbers are 1-based on input, 0-based once parsed
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();
        let Some(word) = parts.next() else {
            return Err("empty command".to_string());
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "next" | "n" => ViewerCommand::Next,
            "prev" | "previous" | "p" => ViewerCommand::Previous,
            "module" | "m" => ViewerCommand::Module(position(parts.next(), "module")?),
            "lesson" | "l" => ViewerCommand::Lesson(position(parts.next(), "lesson")?),
            "play" => ViewerCommand::Play,
            "pause" => ViewerCommand::Pause,
            "complete" | "done" => ViewerCommand::Complete,
            "enroll" => ViewerCommand::Enroll,
            "outline" | "o" => ViewerCommand::Outline,
            "reload" | "retry" | "r" => ViewerCommand::Reload,
            "status" | "s" => ViewerCommand::Status,
            "help" | "h" | "?" => ViewerCommand::Help,
            "quit" | "exit" | "q" => ViewerCommand::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(command)
    }
}

fn position(raw: Option<&str>, what: &str) -> Result<usize, String> {
    let raw = raw.ok_or_else(|| format!("usage: {} <number>", what))?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("invalid {} number '{}'", what, raw)),
    }
}

enum Event {
    Input(Option<String>),
    Timer(crate::viewer::TimerFired),
}

pub async fn handle(course: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = open_session()?;
    if !session.is_authenticated() {
        return Err(ClientError::auth("not logged in; run `lms auth login <email>` first").into());
    }
    let client = api_client(&session)?;

    let mut viewer = CourseViewer::new(client, CourseId::from(course), &config().viewer);
    match viewer.load().await {
        Ok(()) => render(&viewer, output_format)?,
        Err(notice) => {
            output_error(&output_format, &notice.to_string(), Some("LOAD_FAILED"))?;
            if output_format == OutputFormat::Text {
                println!("Type 'reload' to try again or 'quit' to leave.");
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Input(line?),
            fired = viewer.next_timer_fire() => Event::Timer(fired),
        };

        match event {
            Event::Input(None) => break,
            Event::Input(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<ViewerCommand>() {
                    Ok(command) => command,
                    Err(message) => {
                        output_error(&output_format, &message, None)?;
                        continue;
                    }
                };
                if command == ViewerCommand::Quit {
                    break;
                }
                apply(&mut viewer, command, output_format).await?;
            }
            Event::Timer(fired) => {
                if let Some(outcome) = viewer.handle_timer_fire(fired).await {
                    report_completion(&viewer, &outcome, output_format)?;
                }
            }
        }
    }

    viewer.pause();
    if !viewer.is_loaded() {
        anyhow::bail!("course {} could not be loaded", viewer.course_id());
    }
    Ok(())
}

async fn apply(
    viewer: &mut CourseViewer<ApiClient>,
    command: ViewerCommand,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        ViewerCommand::Next | ViewerCommand::Previous => {
            let moved = if command == ViewerCommand::Next {
                viewer.next()
            } else {
                viewer.previous()
            };
            match moved {
                Ok(true) => render(viewer, output_format),
                Ok(false) if command == ViewerCommand::Next => {
                    output_success(&output_format, "End of course", None)
                }
                Ok(false) => output_success(&output_format, "Start of course", None),
                Err(e) => output_error(&output_format, &e.to_string(), Some("NAVIGATION")),
            }
        }
        ViewerCommand::Module(index) => match viewer.select_module_at(index) {
            Ok(()) => render(viewer, output_format),
            Err(e) => output_error(&output_format, &e.to_string(), Some("NAVIGATION")),
        },
        ViewerCommand::Lesson(index) => match viewer.select_lesson_at(index) {
            Ok(()) => render(viewer, output_format),
            Err(e) => output_error(&output_format, &e.to_string(), Some("NAVIGATION")),
        },
        ViewerCommand::Play => {
            if viewer.play() {
                let secs = config().viewer.completion_threshold_secs;
                output_success(
                    &output_format,
                    &format!("Playing. Completes after {}s of continuous play.", secs),
                    None,
                )
            } else if viewer.selected_lesson().is_some_and(|l| viewer.is_watched(&l.id)) {
                output_success(&output_format, "Playing (already completed)", None)
            } else {
                output_error(&output_format, "Nothing to play", None)
            }
        }
        ViewerCommand::Pause => {
            viewer.pause();
            output_success(&output_format, "Paused", None)
        }
        ViewerCommand::Complete => {
            let outcome = viewer.complete_selected().await;
            report_completion(viewer, &outcome, output_format)
        }
        ViewerCommand::Enroll => match viewer.enroll().await {
            EnrollOutcome::Enrolled => {
                output_success(&output_format, "Enrolled", None)?;
                render(viewer, output_format)
            }
            EnrollOutcome::AlreadyEnrolled => {
                output_success(&output_format, "Already enrolled", None)
            }
            EnrollOutcome::NotLoaded => output_error(
                &output_format,
                "Course content has not loaded yet; type 'reload' first",
                Some("NOT_LOADED"),
            ),
            EnrollOutcome::Failed(notice) => {
                output_error(&output_format, &notice.to_string(), Some("ENROLL_FAILED"))
            }
        },
        ViewerCommand::Outline => match output_format {
            OutputFormat::Json => output_json(&serde_json::json!({ "modules": viewer.outline().modules() })),
            OutputFormat::Text => {
                print_outline(viewer);
                Ok(())
            }
        },
        ViewerCommand::Reload => match viewer.load().await {
            Ok(()) => render(viewer, output_format),
            Err(notice) => output_error(&output_format, &notice.to_string(), Some("LOAD_FAILED")),
        },
        ViewerCommand::Status => render(viewer, output_format),
        ViewerCommand::Help => {
            println!("{}", HELP);
            Ok(())
        }
        ViewerCommand::Quit => Ok(()),
    }
}

fn report_completion<B: CourseBackend>(
    viewer: &CourseViewer<B>,
    outcome: &CompletionOutcome,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match outcome {
        CompletionOutcome::Completed => {
            let label = viewer
                .progress()
                .map(|p| format!(" (progress {})", p.percentage_label()))
                .unwrap_or_default();
            output_success(&output_format, &format!("Lesson completed{}", label), None)
        }
        CompletionOutcome::AlreadyCompleted => {
            output_success(&output_format, "Lesson already completed", None)
        }
        CompletionOutcome::NotEnrolled => output_error(
            &output_format,
            "Enroll in the course to track progress",
            Some("NOT_ENROLLED"),
        ),
        CompletionOutcome::UnknownLesson => {
            output_error(&output_format, "No lesson selected", None)
        }
        CompletionOutcome::Failed(notice) => {
            output_error(&output_format, &notice.to_string(), Some("COMPLETE_FAILED"))
        }
    }
}

fn render<B: CourseBackend>(viewer: &CourseViewer<B>, output_format: OutputFormat) -> anyhow::Result<()> {
    if output_format == OutputFormat::Json {
        return output_json(&viewer.snapshot());
    }

    if let Some(notice) = viewer.notice() {
        println!("! {}", notice);
    }
    if !viewer.is_loaded() {
        println!("Course content is not loaded. Type 'reload' to try again.");
        return Ok(());
    }

    match viewer.phase() {
        ViewPhase::NotEnrolled => {
            println!("You are not enrolled in this course. Type 'enroll' to start.");
            print_outline(viewer);
        }
        ViewPhase::EnrolledNoSelection => {
            print_progress(viewer);
            println!("This course has no lessons yet.");
        }
        ViewPhase::Viewing(_) => {
            print_progress(viewer);
            print_lesson(viewer);
        }
    }
    Ok(())
}

fn print_progress<B: CourseBackend>(viewer: &CourseViewer<B>) {
    if let Some(progress) = viewer.progress() {
        println!(
            "Progress: {} {} {}",
            progress.percentage_label(),
            progress_bar(progress.completion_percentage, 20),
            progress.count_label()
        );
    }
}

fn print_outline<B: CourseBackend>(viewer: &CourseViewer<B>) {
    let cursor = viewer.cursor();
    if viewer.outline().is_empty() {
        println!("  (no modules)");
        return;
    }

    for (m, module) in viewer.outline().modules().iter().enumerate() {
        let here = cursor.is_some_and(|c| c.module == m);
        println!("{} {}. {}", if here { ">" } else { " " }, m + 1, module.title);
        for (l, lesson) in module.lessons.iter().enumerate() {
            let selected = here && cursor.and_then(|c| c.lesson) == Some(l);
            let mark = if viewer.is_watched(&lesson.id) { "✓" } else { " " };
            println!(
                "   {} [{}] {}.{} {}",
                if selected { ">" } else { " " },
                mark,
                m + 1,
                l + 1,
                lesson.title
            );
        }
    }
}

fn print_lesson<B: CourseBackend>(viewer: &CourseViewer<B>) {
    let (Some(module), Some(lesson)) = (viewer.selected_module(), viewer.selected_lesson()) else {
        if let Some(module) = viewer.selected_module() {
            println!("\n{}\n  (this module has no lessons)", module.title);
        }
        return;
    };

    println!("\n{} / {}", module.title, lesson.title);
    if viewer.is_watched(&lesson.id) {
        println!("  ✓ completed");
    }
    if lesson.has_video() {
        println!("  Video: {}", lesson.video_url.as_deref().unwrap_or_default());
    }
    println!("\n{}", lesson.body());
}
