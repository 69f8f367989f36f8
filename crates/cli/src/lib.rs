//! # autoscribe-cli
//!
//! Command definitions and handlers for the `autoscribe` binary. Each subcommand runs
//! one or more pipeline stages; PDF work runs on the blocking pool, completion calls
//! run sequentially on the async runtime.

pub mod config;

use crate::config::{
    get_config, AppConfig, TASK_ANSWER_PREDICTION, TASK_CONVERSATION_ANSWERING,
    TASK_QUESTION_EXTRACTION, TASK_UNANSWERED_QUESTIONS,
};
use anyhow::{Context, Result};
use autoscribe::cache::CachedProvider;
use autoscribe::pipeline::{self, PipelinePrompts, Prediction};
use autoscribe::providers::ai::AiProvider;
use autoscribe::providers::factory::create_provider;
use autoscribe::questionnaire::Question;
use autoscribe::{
    reconcile, reconcile_with_follow_up, CompletionClient, FillReport, FormBackend, FormError,
    SelectiveFormFiller,
};
use autoscribe_pdf::{page_texts, LopdfFormBackend};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// --- CLI Definition ---

/// Answers fillable PDF forms from medical records with a chat-completion service.
#[derive(Parser, Debug)]
#[command(name = "autoscribe", author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Path to a YAML configuration file (defaults to ./config.yml if present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the form fields of a PDF with their kind, allowed values and current value
    Fields(FieldsArgs),
    /// Extract the questions of a PDF form, page by page
    Questions(QuestionsArgs),
    /// Extract questions and predict their answers from an EMR text file
    Predict(PredictArgs),
    /// Answer follow-up questions from a conversation transcript
    Answer(AnswerArgs),
    /// Fill a PDF form from an answer file
    Fill(FillArgs),
    /// Run the full pipeline: extract, predict, optionally follow up, and fill
    Run(RunArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Fields(_) => "fields",
            Commands::Questions(_) => "questions",
            Commands::Predict(_) => "predict",
            Commands::Answer(_) => "answer",
            Commands::Fill(_) => "fill",
            Commands::Run(_) => "run",
        }
    }
}

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// The fillable PDF
    pub pdf: PathBuf,
    /// Render the fields as a questionnaire answered with their current values
    #[arg(short, long)]
    pub questionnaire: bool,
}

#[derive(Args, Debug)]
pub struct QuestionsArgs {
    /// The fillable PDF
    pub pdf: PathBuf,
    /// Write the questions to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    /// Write questions.txt, answered_questions.txt and unanswered_questions.txt
    #[arg(short = 'd', long)]
    pub debug_dump: bool,
    /// Directory for the debug dump
    #[arg(long, default_value = "debug")]
    pub dump_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// The fillable PDF
    pub pdf: PathBuf,
    /// The EMR text file
    pub emr: PathBuf,
    /// Where to write the predicted answers
    pub output: PathBuf,
    #[command(flatten)]
    pub dump: DumpArgs,
}

#[derive(Args, Debug)]
pub struct AnswerArgs {
    /// The conversation transcript
    pub conversation: PathBuf,
    /// The unanswered questions
    pub unanswered: PathBuf,
    /// Where to write the answers
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct FillArgs {
    /// The fillable PDF
    pub pdf: PathBuf,
    /// Answers in `FieldName>> Question: Answer` format
    pub answers: PathBuf,
    /// Where to write the filled PDF (may equal the input)
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The fillable PDF
    pub pdf: PathBuf,
    /// The EMR text file
    pub emr: PathBuf,
    /// Where to write the filled PDF
    pub output: PathBuf,
    #[command(flatten)]
    pub dump: DumpArgs,
    /// Answer the questions the EMR left open from this conversation transcript
    #[arg(long, value_name = "CONVERSATION")]
    pub follow_up: Option<PathBuf>,
}

// --- Completion Clients ---

/// One completion client per pipeline task, built once at startup.
pub struct Pipeline {
    pub prompts: PipelinePrompts,
    pub question_extraction: CompletionClient,
    pub answer_prediction: CompletionClient,
    pub unanswered_questions: CompletionClient,
    pub conversation_answering: CompletionClient,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            prompts: config.pipeline_prompts()?,
            question_extraction: build_client(config, TASK_QUESTION_EXTRACTION)?,
            answer_prediction: build_client(config, TASK_ANSWER_PREDICTION)?,
            unanswered_questions: build_client(config, TASK_UNANSWERED_QUESTIONS)?,
            conversation_answering: build_client(config, TASK_CONVERSATION_ANSWERING)?,
        })
    }

    pub fn shutdown(self) {
        self.question_extraction.shutdown();
        self.answer_prediction.shutdown();
        self.unanswered_questions.shutdown();
        self.conversation_answering.shutdown();
    }
}

fn build_client(config: &AppConfig, task: &str) -> Result<CompletionClient> {
    let (task_config, provider_config) = config.task(task)?;
    let provider = create_provider(provider_config, task_config.settings())
        .with_context(|| format!("Failed to create the AI provider for task '{task}'"))?;

    let provider: Box<dyn AiProvider> = match config.cache_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Box::new(CachedProvider::new(provider, dir)),
        _ => provider,
    };
    Ok(CompletionClient::new(provider, config.completion.options()))
}

// --- Entry Point ---

/// Executes the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Fields(args) => handle_fields(args).await,
        Commands::Fill(args) => handle_fill(args).await,
        command => {
            let config = get_config(cli.config.as_deref())?;
            let pipeline = Pipeline::from_config(&config)?;
            let result = match command {
                Commands::Questions(args) => handle_questions(&pipeline, args).await,
                Commands::Predict(args) => handle_predict(&pipeline, args).await,
                Commands::Answer(args) => handle_answer(&pipeline, args).await,
                Commands::Run(args) => handle_run(&pipeline, args).await,
                Commands::Fields(_) | Commands::Fill(_) => Ok(()),
            };
            pipeline.shutdown();
            result
        }
    }
}

// --- Helpers ---

/// Runs PDF work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T, FormError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))
}

async fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

async fn gather_questions(pipeline: &Pipeline, pdf: &Path) -> Result<Vec<String>> {
    let path = pdf.to_path_buf();
    let (fields, pages) = blocking(move || {
        let fields = LopdfFormBackend::new().read_fields(&path)?;
        Ok((fields, page_texts(&path)?))
    })
    .await?;

    let names: Vec<String> = fields.into_iter().map(|field| field.name).collect();
    let questions = pipeline::extract_questions(
        &pipeline.question_extraction,
        &pipeline.prompts.question_extraction,
        &names,
        &pages,
    )
    .await;
    if questions.is_empty() {
        warn!("No questions were extracted from '{}'.", pdf.display());
    }
    Ok(questions)
}

async fn list_unanswered(pipeline: &Pipeline, prediction: &Prediction) -> String {
    pipeline::list_unanswered_questions(
        &pipeline.unanswered_questions,
        &pipeline.prompts.unanswered_questions,
        &prediction.query,
        &prediction.answers,
    )
    .await
}

/// Extracts questions, predicts answers and writes the optional debug dump.
///
/// Returns the prediction and, when the dump was written, the unanswered questions.
async fn predict(
    pipeline: &Pipeline,
    pdf: &Path,
    emr_path: &Path,
    dump: &DumpArgs,
) -> Result<(Prediction, Option<String>)> {
    let emr = read_text(emr_path).await?;
    let questions = gather_questions(pipeline, pdf).await?;
    let prediction = pipeline::predict_answers(
        &pipeline.answer_prediction,
        &pipeline.prompts.answer_prediction,
        &questions,
        &emr,
    )
    .await;

    if !dump.debug_dump {
        return Ok((prediction, None));
    }

    let unanswered = list_unanswered(pipeline, &prediction).await;
    let dir = &dump.dump_dir;
    write_text(&dir.join("questions.txt"), &questions.join("\n")).await?;
    write_text(&dir.join("answered_questions.txt"), &prediction.answers).await?;
    write_text(
        &dir.join("unanswered_questions.txt"),
        &pipeline::format_follow_up(&unanswered),
    )
    .await?;
    info!("Wrote debug dump to '{}'.", dir.display());
    Ok((prediction, Some(unanswered)))
}

/// Reconciles the answers, plus any follow-up answers, against the form and fills it.
async fn fill_document(
    pdf: &Path,
    output: &Path,
    answers: String,
    follow_up: Option<String>,
) -> Result<FillReport> {
    let (pdf, output) = (pdf.to_path_buf(), output.to_path_buf());
    blocking(move || {
        let backend = LopdfFormBackend::new();
        let fields = backend.read_fields(&pdf)?;
        let values = match &follow_up {
            Some(follow_up) => reconcile_with_follow_up(&answers, follow_up, &fields),
            None => reconcile(&answers, &fields),
        };
        SelectiveFormFiller::new(&backend).fill(&pdf, &output, &values)
    })
    .await
}

fn print_report(report: &FillReport) {
    println!(
        "Filled {} of {} answered fields into '{}' ({} unanswered skipped).",
        report.applied,
        report.attempted,
        report.destination.display(),
        report.skipped_unanswered
    );
    for failure in &report.failures {
        println!("  failed: {}: {}", failure.field, failure.reason);
    }
}

// --- Command Handlers ---

async fn handle_fields(args: &FieldsArgs) -> Result<()> {
    let pdf = args.pdf.clone();
    let fields = blocking(move || LopdfFormBackend::new().field_values(&pdf)).await?;

    if args.questionnaire {
        let questions: Vec<String> = fields
            .iter()
            .filter_map(|(field, value)| Question::for_field(field, value.as_deref()))
            .map(|question| question.to_string())
            .collect();
        println!("{}", questions.join("\n\n"));
        return Ok(());
    }

    for (field, value) in fields {
        let allowed = field
            .allowed_values
            .map(|values| values.into_iter().collect::<Vec<_>>().join("|"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}",
            field.name,
            field.kind,
            allowed,
            value.unwrap_or_default()
        );
    }
    Ok(())
}

async fn handle_questions(pipeline: &Pipeline, args: &QuestionsArgs) -> Result<()> {
    let questions = gather_questions(pipeline, &args.pdf).await?.join("\n");
    match &args.output {
        Some(path) => {
            write_text(path, &questions).await?;
            println!("Questions saved to '{}'.", path.display());
        }
        None => println!("{questions}"),
    }
    Ok(())
}

async fn handle_predict(pipeline: &Pipeline, args: &PredictArgs) -> Result<()> {
    let (prediction, _) = predict(pipeline, &args.pdf, &args.emr, &args.dump).await?;
    write_text(&args.output, &prediction.answers).await?;
    println!("Answers predicted and saved to '{}'.", args.output.display());
    Ok(())
}

async fn handle_answer(pipeline: &Pipeline, args: &AnswerArgs) -> Result<()> {
    let conversation = read_text(&args.conversation).await?;
    let unanswered = read_text(&args.unanswered).await?;
    let answers = pipeline::answer_from_conversation(
        &pipeline.conversation_answering,
        &pipeline.prompts.conversation_answering,
        &conversation,
        &unanswered,
    )
    .await;
    write_text(&args.output, &answers).await?;
    println!("Answers generated and saved to '{}'.", args.output.display());
    Ok(())
}

async fn handle_fill(args: &FillArgs) -> Result<()> {
    let answers = read_text(&args.answers).await?;
    let report = fill_document(&args.pdf, &args.output, answers, None).await?;
    print_report(&report);
    Ok(())
}

async fn handle_run(pipeline: &Pipeline, args: &RunArgs) -> Result<()> {
    let (prediction, dumped_unanswered) =
        predict(pipeline, &args.pdf, &args.emr, &args.dump).await?;

    let follow_up = match &args.follow_up {
        Some(conversation_path) => {
            let conversation = read_text(conversation_path).await?;
            let unanswered = match dumped_unanswered {
                Some(unanswered) => unanswered,
                None => list_unanswered(pipeline, &prediction).await,
            };
            let follow_up = pipeline::answer_from_conversation(
                &pipeline.conversation_answering,
                &pipeline.prompts.conversation_answering,
                &conversation,
                &unanswered,
            )
            .await;
            Some(follow_up)
        }
        None => None,
    };

    let report = fill_document(&args.pdf, &args.output, prediction.answers, follow_up).await?;
    print_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_follow_up() {
        let cli = Cli::try_parse_from([
            "autoscribe",
            "-v",
            "run",
            "form.pdf",
            "emr.txt",
            "out.pdf",
            "-d",
            "--follow-up",
            "conversation.txt",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.command.name(), "run");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.dump.debug_dump);
                assert_eq!(args.dump.dump_dir, PathBuf::from("debug"));
                assert_eq!(args.follow_up, Some(PathBuf::from("conversation.txt")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
