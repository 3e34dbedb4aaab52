use std::error::Error;
use std::io::{self, Write as _};

use chrono::{Duration, NaiveDate};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quiz_core::model::{
    Question, RegistrationDraft, ReportRange, SessionSummary, TopicId, option_index,
    option_letter,
};
use quiz_core::time::format_elapsed;
use services::{
    Advance, AppServices, Current, IdentityProvider, Recovery, SessionAnswer, SessionController,
    SessionError, SessionState,
};

use crate::args::Command;

type CommandResult = Result<(), Box<dyn Error>>;

/// Line-based reader over stdin.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `message` and read one trimmed line; `None` at end of input.
    async fn ask(&mut self, message: &str) -> io::Result<Option<String>> {
        print!("{message} ");
        io::stdout().flush()?;
        Ok(self.lines.next_line().await?.map(|line| line.trim().to_owned()))
    }

    /// Yes/no question; anything but `n`/`q` (or end of input) means yes.
    async fn confirm(&mut self, message: &str) -> io::Result<bool> {
        Ok(match self.ask(message).await? {
            Some(answer) => !matches!(answer.to_lowercase().as_str(), "n" | "q" | "no"),
            None => false,
        })
    }
}

pub async fn dispatch(app: &AppServices, command: Command) -> CommandResult {
    match command {
        Command::Register {
            name,
            email,
            password,
            confirm,
        } => {
            let user = app
                .identity()
                .register(RegistrationDraft {
                    name,
                    email,
                    password,
                    confirm_password: confirm,
                })
                .await?;
            println!("Registered and signed in as {} <{}>.", user.name, user.email);
        }
        Command::Login { email, password } => {
            let user = app.identity().login(&email, &password).await?;
            println!("Signed in as {}.", user.name);
        }
        Command::Logout => {
            app.identity().logout().await?;
            println!("Signed out.");
        }
        Command::Quiz { topic } => {
            let user = app.identity().require_user().await?;
            println!("Hello, {}!", user.name);
            run_quiz(&app.sessions(), &topic, &mut Prompt::stdin()).await?;
        }
        Command::History { topic, limit } => {
            let topic = TopicId::new(topic)?;
            print_history(app, &topic, limit).await?;
        }
        Command::Report { from, to } => {
            let today = app.session_summaries().now().date_naive();
            let range = report_range(from, to, today);
            print_report(app, range).await?;
        }
    }
    Ok(())
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

async fn run_quiz(controller: &SessionController, topic: &str, prompt: &mut Prompt) -> CommandResult {
    let mut state = match controller.start(topic).await {
        Ok(state) => state,
        Err(err) => {
            if err.recovery() == Recovery::Reload {
                eprintln!("Could not load the exercise. Run the command again to retry.");
            }
            return Err(err.into());
        }
    };

    loop {
        let question = match controller.present_current(&mut state)? {
            Current::Question(question) => question.clone(),
            Current::Complete(summary) => {
                print_summary(summary);
                return Ok(());
            }
        };
        print_question(controller, &state, &question);

        let Some(index) = read_choice(prompt, &question).await? else {
            println!("Session abandoned.");
            return Ok(());
        };
        controller.select(&mut state, index)?;

        let Some(answer) = submit_with_retry(controller, &mut state, prompt).await? else {
            println!("Session abandoned.");
            return Ok(());
        };
        print_feedback(&answer);

        if prompt.ask("Press Enter to continue...").await?.is_none() {
            println!("Session abandoned.");
            return Ok(());
        }
        if let Some(summary) = advance_with_retry(controller, &mut state, prompt).await? {
            print_summary(&summary);
            return Ok(());
        }
    }
}

/// Ask for an option letter until one is valid. `None` means the user quit.
async fn read_choice(prompt: &mut Prompt, question: &Question) -> io::Result<Option<usize>> {
    loop {
        let Some(raw) = prompt.ask("Your answer (letter, q to quit):").await? else {
            return Ok(None);
        };
        if raw.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let index = raw.chars().next().and_then(option_index);
        match index {
            Some(index) if raw.chars().count() == 1 && question.accepts(index) => {
                return Ok(Some(index));
            }
            _ => println!("Choose one of the letters shown."),
        }
    }
}

async fn submit_with_retry(
    controller: &SessionController,
    state: &mut SessionState,
    prompt: &mut Prompt,
) -> Result<Option<SessionAnswer>, Box<dyn Error>> {
    loop {
        match controller.submit(state).await {
            Ok(answer) => return Ok(Some(answer)),
            Err(err) if err.recovery() == Recovery::Retry => {
                eprintln!("{err}");
                if !prompt.confirm("Submit again? [Y/n]").await? {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Advance; returns the summary when the session finished.
async fn advance_with_retry(
    controller: &SessionController,
    state: &mut SessionState,
    prompt: &mut Prompt,
) -> Result<Option<SessionSummary>, Box<dyn Error>> {
    match controller.advance(state).await {
        Ok(Advance::Next) => return Ok(None),
        Ok(Advance::Completed { summary, .. }) => return Ok(Some(summary)),
        Err(err @ SessionError::Storage(_)) => eprintln!("{err}"),
        Err(err) => return Err(err.into()),
    }

    // The session is over but its summary was not stored yet.
    loop {
        if !prompt.confirm("Saving the result failed. Try again? [Y/n]").await? {
            break;
        }
        match controller.finalize_summary(state).await {
            Ok(_) => break,
            Err(err @ SessionError::Storage(_)) => eprintln!("{err}"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(state.summary().cloned())
}

fn print_question(controller: &SessionController, state: &SessionState, question: &Question) {
    let progress = controller.progress(state);
    let elapsed = controller.elapsed(state);
    println!();
    println!(
        "[{}/{}] {}  ({})",
        progress.answered + 1,
        progress.total,
        question.display_title(),
        elapsed.session_display()
    );
    if let Some(level) = question.level() {
        println!("Level: {level}");
    }
    println!("{}", question.text());
    for (index, option) in question.options().iter().enumerate() {
        let letter = option_letter(index).unwrap_or('?');
        println!("  {letter}) {option}");
    }
}

fn print_feedback(answer: &SessionAnswer) {
    if answer.record.is_correct() {
        println!("Correct!");
    } else {
        println!("Incorrect.");
    }
    if !answer.explanation.is_empty() {
        println!("{}", answer.explanation);
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Topic:     {}", summary.topic());
    println!("Correct:   {}", summary.correct());
    println!("Incorrect: {}", summary.incorrect());
    println!("Questions: {}", summary.question_count());
    println!("Time:      {}", format_elapsed(summary.time_spent_secs()));
    println!("Accuracy:  {}%", summary.accuracy_percent());
}

//
// ─── HISTORY & REPORT ──────────────────────────────────────────────────────────
//

async fn print_history(app: &AppServices, topic: &TopicId, limit: u32) -> CommandResult {
    let items = app.session_summaries().list_summaries(topic, limit).await?;
    if items.is_empty() {
        println!("No sessions stored for {topic}.");
        return Ok(());
    }
    for item in items {
        println!(
            "#{:<4} {}  {}/{} correct  {}",
            item.id,
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.correct,
            item.questions,
            format_elapsed(item.time_spent_secs)
        );
    }
    Ok(())
}

fn report_range(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> ReportRange {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(30));
    ReportRange::new(from, to)
}

async fn print_report(app: &AppServices, range: ReportRange) -> CommandResult {
    let report = app.dashboard().fetch_performance(range).await?;
    println!("Period:        {} to {}", range.from, range.to);
    println!("Correct:       {}", report.correct);
    println!("Incorrect:     {}", report.incorrect);
    println!("Accuracy:      {}%", report.accuracy_percent());
    println!("Average time:  {}", format_elapsed(report.average_time_secs));
    if !report.timeline.is_empty() {
        println!("By day:");
        for day in &report.timeline {
            println!("  {}  {} correct, {} incorrect", day.date, day.correct, day.incorrect);
        }
    }
    if !report.errors_by_category.is_empty() {
        println!("Errors by category:");
        for category in &report.errors_by_category {
            println!("  {}: {}", category.category, category.count);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn report_defaults_to_last_thirty_days() {
        let range = report_range(None, None, date(2024, 3, 31));
        assert_eq!(range.from, date(2024, 3, 1));
        assert_eq!(range.to, date(2024, 3, 31));
    }

    #[test]
    fn report_keeps_explicit_bounds() {
        let range = report_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 7)), date(2024, 3, 31));
        assert_eq!(range.from, date(2024, 1, 1));
        assert_eq!(range.to, date(2024, 1, 7));
    }
}
