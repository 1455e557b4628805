use crate::infra::{document_validator, knowledge_tool, loan_decider, shortlisting_agent};
use clap::{Args, ValueEnum};
use helpdesk::config::AppConfig;
use helpdesk::error::AppError;
use helpdesk::workflows::admissions::review_result_sheet;
use helpdesk::workflows::loans::LoanApplication;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ShortlistArgs {
    /// Result sheet image (jpg, jpeg or png)
    #[arg(long)]
    pub(crate) image: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct LoanEvaluateArgs {
    /// Annual household income
    #[arg(long)]
    pub(crate) income: f64,
    /// Requested loan amount
    #[arg(long)]
    pub(crate) requested: f64,
    /// Evaluate as a student who was not shortlisted
    #[arg(long)]
    pub(crate) not_shortlisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FaqDomain {
    Admissions,
    Loans,
}

#[derive(Args, Debug)]
pub(crate) struct FaqArgs {
    /// Which FAQ corpus to search
    #[arg(long, value_enum, default_value_t = FaqDomain::Admissions)]
    pub(crate) domain: FaqDomain,
    /// The question to ask
    pub(crate) question: String,
}

pub(crate) async fn run_shortlist(args: ShortlistArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let validator = document_validator(&config);
    let review = review_result_sheet(&validator, &args.image).await;

    println!("Result sheet: {}", args.image.display());
    match &review.extracted_text {
        Some(text) => {
            println!("\nExtracted text");
            for line in text.lines().filter(|line| !line.trim().is_empty()) {
                println!("  {line}");
            }
        }
        None => println!("\nNo text could be extracted."),
    }

    println!("\nValidation: {}", review.validation.message);
    println!(
        "Parsed: result={} overall_grade={}",
        review.parsed.result.as_deref().unwrap_or("-"),
        review.parsed.overall_grade.as_deref().unwrap_or("-")
    );

    let decision = shortlisting_agent(&config).shortlist_query(&review.query());
    println!("Decision: {decision}");
    Ok(())
}

pub(crate) fn run_loan_evaluation(args: LoanEvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let decider = loan_decider(&config);
    let application = LoanApplication::new(!args.not_shortlisted, args.income, args.requested);

    println!("{}", decider.approve_loan(&application));
    Ok(())
}

pub(crate) async fn run_faq(args: FaqArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let corpus = match args.domain {
        FaqDomain::Admissions => &config.knowledge.admissions_faq,
        FaqDomain::Loans => &config.knowledge.loan_faq,
    };
    let tool = knowledge_tool(&config.knowledge, corpus).await?;
    let answer = tool.ask(&args.question).await?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!("\nSources");
        for source in &answer.sources {
            println!("  - {} ({:.2})", source.question, source.score);
        }
    }
    Ok(())
}
