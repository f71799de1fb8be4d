use std::fmt;

use chrono::{DateTime, Utc};
use encore_core::model::{
    ChoiceOption, CompletionTier, FillInBlankTier, IntroTier, Lesson, LessonDraft, LessonId,
    MultipleChoiceTier, StepsTier, TierSet,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    lessons: u32,
    draft: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLessons { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("ENCORE_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut lessons = std::env::var("ENCORE_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut draft = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--draft" => {
                    draft = true;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            lessons,
            draft,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --lessons <n>             Number of sample lessons to upsert (default: 3)");
    eprintln!("  --draft                   Seed the lessons unpublished");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  ENCORE_DB_URL, ENCORE_LESSONS");
}

struct SampleLesson {
    // Fixed ids keep re-seeding idempotent: rerunning updates the same rows.
    id: &'static str,
    title: &'static str,
    artist: &'static str,
    topic: &'static str,
    difficulty: u8,
    intro_heading: &'static str,
    intro_body: &'static str,
    steps: &'static [&'static str],
    mc_question: &'static str,
    mc_correct: &'static str,
    mc_wrong: [&'static str; 2],
    fib_question: &'static str,
    fib_answer: &'static str,
    fib_variants: &'static [&'static str],
    summary: &'static str,
    badge_key: &'static str,
}

fn samples() -> Vec<SampleLesson> {
    vec![
        SampleLesson {
            id: "3f7d1b9a-0000-4000-8000-000000000001",
            title: "Linear equations with NewJeans",
            artist: "NewJeans",
            topic: "linear-equations",
            difficulty: 2,
            intro_heading: "Solving for the missing member",
            intro_body: "NewJeans debuted with 5 members. If x members join a stage and \
                         2 step off, the line-up count becomes an equation you can solve.",
            steps: &[
                "Write what you know as an equation: 5 + x - 2 = 7.",
                "Collect the plain numbers: 3 + x = 7.",
                "Subtract 3 from both sides: x = 4.",
            ],
            mc_question: "5 + x - 2 = 7. How many members joined the stage?",
            mc_correct: "4",
            mc_wrong: ["2", "5"],
            fib_question: "Solve for x: x + 3 = 11. x equals ____.",
            fib_answer: "eight",
            fib_variants: &["8"],
            summary: "You solved your first equation. Encore!",
            badge_key: "first-equation",
        },
        SampleLesson {
            id: "3f7d1b9a-0000-4000-8000-000000000002",
            title: "Fractions of a BTS setlist",
            artist: "BTS",
            topic: "fractions",
            difficulty: 3,
            intro_heading: "Slicing the setlist",
            intro_body: "A BTS concert runs 20 songs. Fractions tell you how much of the \
                         night belongs to each album era.",
            steps: &[
                "Count the songs from one era: 5 out of 20.",
                "Write it as a fraction: 5/20.",
                "Divide top and bottom by 5: 1/4 of the show.",
            ],
            mc_question: "5 of 20 songs are from one album. What fraction of the show is that?",
            mc_correct: "1/4",
            mc_wrong: ["1/5", "1/2"],
            fib_question: "Reduce 10/20 to its simplest form: ____.",
            fib_answer: "1/2",
            fib_variants: &["one half", "a half"],
            summary: "Setlist fractions reduced like a pro.",
            badge_key: "setlist-slicer",
        },
        SampleLesson {
            id: "3f7d1b9a-0000-4000-8000-000000000003",
            title: "Percentages with BLACKPINK streams",
            artist: "BLACKPINK",
            topic: "percentages",
            difficulty: 3,
            intro_heading: "Counting the streams",
            intro_body: "A BLACKPINK video gained 50 million views this month on top of \
                         200 million. Percent change turns that jump into one number.",
            steps: &[
                "Find the change: 250 - 200 = 50 million.",
                "Divide by the starting value: 50 / 200 = 0.25.",
                "Multiply by 100 to get the percent: 25%.",
            ],
            mc_question: "Views went from 200M to 250M. What is the percent increase?",
            mc_correct: "25%",
            mc_wrong: ["20%", "50%"],
            fib_question: "What is 10% of 200? ____.",
            fib_answer: "twenty",
            fib_variants: &["20"],
            summary: "Stream math unlocked. Keep the numbers climbing.",
            badge_key: "stream-counter",
        },
    ]
}

fn build_lesson(
    sample: &SampleLesson,
    published: bool,
    now: DateTime<Utc>,
) -> Result<Lesson, Box<dyn std::error::Error>> {
    let id: LessonId = sample.id.parse()?;
    let mut options = vec![ChoiceOption::new("a", sample.mc_correct, true)];
    for (index, wrong) in sample.mc_wrong.iter().enumerate() {
        let option_id = ["b", "c"][index];
        options.push(ChoiceOption::new(option_id, *wrong, false));
    }

    let tiers = TierSet::new(
        IntroTier::new(sample.intro_heading, sample.intro_body, None)?,
        StepsTier::new(sample.steps.iter().map(|s| (*s).to_owned()).collect())?,
        MultipleChoiceTier::new(sample.mc_question, options, 10)?,
        FillInBlankTier::new(
            sample.fib_question,
            sample.fib_answer,
            sample.fib_variants.iter().map(|v| (*v).to_owned()).collect(),
            15,
        )?,
        CompletionTier::new(sample.summary, 25, Some(sample.badge_key.to_owned()), None)?,
    );

    let lesson = LessonDraft {
        title: sample.title.to_owned(),
        description: None,
        artist: sample.artist.to_owned(),
        topic: sample.topic.to_owned(),
        difficulty: sample.difficulty,
        published,
        tiers,
    }
    .validate(id, now, now)?;

    Ok(lesson)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let samples = samples();
    let count = samples.len().min(args.lessons as usize);
    for sample in samples.iter().take(count) {
        let lesson = build_lesson(sample, !args.draft, now)?;
        storage.lessons.upsert_lesson(&lesson).await?;
    }

    println!("Seeded {} lessons into {}", count, args.db_url);

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
