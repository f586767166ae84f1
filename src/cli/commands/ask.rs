use anyhow::Result;
use clap::Args;

use super::AppContext;
use crate::cli::output::{OutputFormat, UsageInfo, get_formatter};
use crate::models::Message;
use crate::repository::MessageRepository;
use crate::services::jobs::PollOutcome;
use crate::services::model::{PlainWriter, SseWriter};
use crate::services::{AnswerRequest, AnswerService, AnswerSettings};

const DEFAULT_CHAT: &str = "cli";

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(help = "Question to answer")]
    pub question: String,

    #[arg(long, short = 's', help = "Store to search (default store if omitted)")]
    pub store: Option<String>,

    #[arg(long, help = "Write raw server-sent event frames instead of plain text")]
    pub sse: bool,

    #[arg(long, help = "Chat the exchange is recorded under")]
    pub chat: Option<String>,
}

fn message_name() -> String {
    format!("message_{}", uuid::Uuid::new_v4().simple())
}

pub async fn handle_ask(
    args: AskArgs,
    ctx: &AppContext,
    owner: &str,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let chat = args.chat.as_deref().unwrap_or(DEFAULT_CHAT);

    let question = Message::new(owner, &message_name(), chat, "user", &args.question);
    ctx.records.add_message(&question).await?;
    let mut reply = Message::new(owner, &message_name(), chat, "AI", "");
    reply.reply_to = question.name.clone();
    ctx.records.add_message(&reply).await?;

    let service = AnswerService::new(
        ctx.catalog.clone(),
        ctx.catalog.clone(),
        ctx.records.clone(),
        ctx.records.clone(),
        ctx.client.clone(),
        AnswerSettings::from_config(&ctx.config),
    );
    let request = AnswerRequest {
        reply: Some(reply.name.as_str()),
        ..AnswerRequest::new(owner, args.store.as_deref().unwrap_or(""), &args.question)
    };

    let stdout = tokio::io::stdout();
    let answer = if args.sse {
        let mut sink = SseWriter::new(stdout);
        service.answer(&request, &mut sink).await?
    } else {
        let mut sink = PlainWriter::new(stdout);
        let answer = service.answer(&request, &mut sink).await?;
        println!();
        answer
    };

    let usage = UsageInfo {
        model: answer.model.clone(),
        store: answer.store.clone(),
        passages: answer
            .passages
            .iter()
            .map(|p| (p.vector.file.clone(), p.score))
            .collect(),
        result: answer.result.clone(),
    };
    eprint!("{}", formatter.format_usage(&usage));

    if let Some(job) = answer.image_job {
        eprintln!("Waiting for the image to become available...");
        match job.wait().await {
            PollOutcome::Ready { attempts } => {
                eprintln!("Image ready after {attempts} attempt(s).");
            }
            PollOutcome::Exhausted { attempts } => {
                eprintln!("Image still unavailable after {attempts} attempts.");
            }
            PollOutcome::Cancelled => eprintln!("Image check cancelled."),
        }
    }

    Ok(())
}
