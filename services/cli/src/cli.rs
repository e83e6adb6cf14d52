use crate::commands::{self, FieldArgs, SectionArgs, StepArgs, TransitionArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::infra::{self, Workspace};
use clap::{Args, Parser, Subcommand};
use lcq::config::AppConfig;
use lcq::error::AppError;
use lcq::telemetry;
use lcq::workflows::questionnaire::{ApplicationId, ApplicationStatus, ApplicationType};

#[derive(Parser, Debug)]
#[command(
    name = "lcq",
    about = "Lateral candidate questionnaire: fill in, submit, and review applications",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the questionnaire steps for an application type
    Steps {
        #[arg(
            long = "type",
            value_parser = infra::parse_application_type,
            default_value = "individual"
        )]
        application_type: ApplicationType,
    },
    /// Create a local account
    Register(CredentialArgs),
    /// Sign in and store a session
    Login(CredentialArgs),
    /// Drop the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Start a new application and print its id
    Start {
        #[arg(long = "type", value_parser = infra::parse_application_type)]
        application_type: ApplicationType,
    },
    /// Set a single form field (dotted path) and save the draft
    Set(FieldArgs),
    /// Check whether a step may be opened
    Access(StepArgs),
    /// Validate a step, mark it complete, and move to the next one
    Next(StepArgs),
    /// Replace a whole section of the form and save the draft
    Save(SectionArgs),
    /// Submit a completed application
    Submit {
        #[arg(value_parser = infra::parse_application_id)]
        id: ApplicationId,
    },
    /// Withdraw an application
    Withdraw {
        #[arg(value_parser = infra::parse_application_id)]
        id: ApplicationId,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print an application, or list your applications when no id is given
    Show {
        #[arg(value_parser = infra::parse_application_id)]
        id: Option<ApplicationId>,
    },
    /// Print the status history of an application
    History {
        #[arg(value_parser = infra::parse_application_id)]
        id: ApplicationId,
    },
    /// Reviewer actions
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
    /// Walk an in-memory application from registration to a review decision
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// List applications, optionally narrowed to a status
    List {
        #[arg(long, value_parser = infra::parse_status)]
        status: Option<ApplicationStatus>,
    },
    /// Move an application to a new status
    Transition(TransitionArgs),
}

#[derive(Args, Debug)]
pub(crate) struct CredentialArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config)?;

    let workspace = || Workspace::open(&config);

    match cli.command {
        Command::Steps { application_type } => {
            commands::print_steps(application_type);
            Ok(())
        }
        Command::Register(args) => commands::register(&workspace()?, &args),
        Command::Login(args) => commands::login(&workspace()?, &args),
        Command::Logout => commands::logout(&workspace()?),
        Command::Whoami => commands::whoami(&workspace()?),
        Command::Start { application_type } => commands::start(&workspace()?, application_type),
        Command::Set(args) => commands::set_field(&workspace()?, args),
        Command::Access(args) => commands::access(&workspace()?, &args),
        Command::Next(args) => commands::next(&workspace()?, &args),
        Command::Save(args) => commands::save_section(&workspace()?, args),
        Command::Submit { id } => commands::submit(&workspace()?, &id),
        Command::Withdraw { id, comment } => commands::withdraw(&workspace()?, &id, comment),
        Command::Show { id } => commands::show(&workspace()?, id.as_ref()),
        Command::History { id } => commands::history(&workspace()?, &id),
        Command::Review {
            command: ReviewCommand::List { status },
        } => commands::review_list(&workspace()?, status),
        Command::Review {
            command: ReviewCommand::Transition(args),
        } => commands::review_transition(&workspace()?, args),
        Command::Demo(args) => run_demo(args),
    }
}
