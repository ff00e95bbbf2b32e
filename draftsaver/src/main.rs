use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use draftsaver::form::fields;
use draftsaver::{
    telemetry, validate, video, Attachment, Config, DraftSaver, ReqwestSaveEndpoint, SaveReport, SharedForm, SubmitIntent,
};

const HELP: &str = "\
commands:
  set <field> <value>   change a text field (title, slug, excerpt, content, youtube_url)
  category [id]         select a category, or clear it
  attach <path>         pick a cover image
  detach                remove the cover image
  video <url>           set the YouTube URL and show its embed preview
  submit                save now as a draft
  review                save now and submit for review
  stats                 show save counters and form hints
  help                  show this text
  quit                  stop after pending saves finish";

/// Wait for Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down gracefully...");
}

fn print_report(report: &SaveReport) {
    println!("[{} #{}] {}", report.kind, report.seq, report.status_line());
    if let Err(draftsaver::SaveError::Invalid(errors)) = &report.outcome {
        for e in errors {
            println!("  {}: {}", e.field, e.message);
        }
    }
}

fn print_video_preview(url: &str) {
    match video::resolve(url) {
        Some(id) => println!("preview: {}", id.embed_url()),
        None => println!("not a valid YouTube URL"),
    }
}

/// Apply one input line. Returns false when the user asked to quit.
async fn handle_line(line: &str, form: &SharedForm, saver: &DraftSaver) -> bool {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').map_or((line, ""), |(c, r)| (c, r.trim()));

    match command {
        "" => {}
        "set" => match rest.split_once(' ') {
            Some((field, value)) => {
                form.set_text(field, value);
                saver.field_changed();
                if field == fields::VIDEO_URL {
                    print_video_preview(value);
                }
                if field == fields::TITLE {
                    println!("slug: {}", validate::slug(value));
                }
            }
            None if !rest.is_empty() => {
                form.set_text(rest, "");
                saver.field_changed();
            }
            None => println!("usage: set <field> <value>"),
        },
        "category" => {
            let choice = (!rest.is_empty()).then(|| rest.to_string());
            form.select(fields::CATEGORY, choice);
            saver.field_changed();
        }
        "attach" => match Attachment::from_path(Path::new(rest)).await {
            Ok(attachment) => {
                let name = attachment.file_name.clone();
                match form.attach(fields::COVER_IMAGE, attachment) {
                    Ok(()) => println!("attached {name}"),
                    Err(e) => println!("{e}"),
                }
                saver.field_changed();
            }
            Err(e) => println!("{e}"),
        },
        "video" => {
            form.set_text(fields::VIDEO_URL, rest);
            saver.field_changed();
            if !rest.is_empty() {
                print_video_preview(rest);
            }
        }
        "detach" => {
            form.clear_file(fields::COVER_IMAGE);
            saver.field_changed();
        }
        "submit" => saver.submit(SubmitIntent::Draft),
        "review" => saver.submit(SubmitIntent::Review),
        "stats" => {
            let snapshot = draftsaver::FormSource::snapshot(form);
            println!("{:?} in_flight={}", saver.stats(), saver.is_in_flight());
            println!(
                "{} words, {} excerpt characters left",
                validate::word_count(snapshot.text(fields::CONTENT)),
                validate::excerpt_remaining(snapshot.text(fields::EXCERPT))
            );
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return false,
        other => println!("unknown command '{other}', try 'help'"),
    }

    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = draftsaver::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;
    tracing::debug!(?config, "Loaded configuration");

    let endpoint = Arc::new(ReqwestSaveEndpoint::new(
        config.save_url.clone(),
        config.request_timeout,
        config.csrf_token.clone(),
    )?);

    let shutdown = CancellationToken::new();
    let form = SharedForm::new();
    let (saver, mut reports) = DraftSaver::spawn(form.clone(), endpoint, config.saver_config(), shutdown.clone());

    println!("Editing draft {} (saves to {})", saver.form_id(), config.save_url);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            Some(report) = reports.recv() => print_report(&report),
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_line(&line, &form, &saver).await {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    shutdown.cancel();
    saver.shutdown().await;
    while let Some(report) = reports.recv().await {
        print_report(&report);
    }

    Ok(())
}
