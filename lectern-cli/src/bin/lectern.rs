use anyhow::anyhow;
use lectern::crypto::hash_password;
use lectern::types::{
    ChatContext, ChatMessage, ContextType, Conversation, Credentials, HistoryResponse,
    SaveConversationRequest, SignupRequest, TutorChatReply, TutorChatRequest,
};
use lectern::{ApiClient, ApiConfig, ApiError, FileStorage, RequestOptions, SessionStore};
use lectern_cli::pretty::{pp_conversation, pp_history, pp_status, pp_tutor_reply};
use lectern_cli::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored_json::to_colored_json_auto;
use lectern::client::Method;
use log::{self, debug, warn};
use std::io::Write;
use structopt::StructOpt;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(StructOpt)]
#[structopt(
    rename_all = "kebab-case",
    about = "CLI interface for the lectern e-learning platform"
)]
struct Opt {
    /// Base URL of the platform API. Defaults to http://localhost:8000/api
    #[structopt(global = true, long = "--api-url", env = "LECTERN_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted login session. Defaults to ~/.lectern
    #[structopt(
        global = true,
        long = "--state-dir",
        env = "LECTERN_STATE_DIR",
        parse(from_os_str)
    )]
    state_dir: Option<PathBuf>,

    /// Log more messages. Pass multiple times for ever more verbosity
    ///
    /// By default, it'll only report errors. Passing `-v` one time also prints
    /// warnings, `-vv` enables info logging, `-vvv` debug, and `-vvvv` trace.
    #[structopt(global = true, long, short = "v", parse(from_occurrences))]
    verbose: i8,

    #[structopt(long = "--shell-completions", hidden = true)]
    shell_completions: Option<structopt::clap::Shell>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum AccountCommand {
    /// Register a new account
    Register {
        #[structopt(long, short)]
        name: String,

        #[structopt(long, short)]
        mail: String,

        #[structopt(long, short)]
        password: String,

        /// Send the SHA-256 hex digest of the password instead of the password
        #[structopt(long)]
        prehash: bool,
    },
    /// Log in with mail or name, and keep the session locally
    Login {
        #[structopt(long, short)]
        mail: Option<String>,

        #[structopt(long, short)]
        name: Option<String>,

        #[structopt(long, short)]
        password: String,

        /// Send the SHA-256 hex digest of the password instead of the password
        #[structopt(long)]
        prehash: bool,
    },
    /// End the session on the server and forget it locally
    Logout,
    Profile,
    UpdateProfile {
        fields: Vec<ArgField>,
    },
    StudentProfile,
    UpdateStudentProfile {
        fields: Vec<ArgField>,
    },
    Settings,
    UpdateSettings {
        fields: Vec<ArgField>,
    },
    ChangePassword {
        fields: Vec<ArgField>,
    },
}

#[derive(StructOpt)]
enum CourseCommand {
    List,
    Get { id: String },
    Enroll { id: String },
    Progress,
}

#[derive(StructOpt)]
enum TutorCommand {
    /// Ask the AI tutor a question
    Ask {
        message: String,

        /// One of: explain_topic, practice_questions, code_examples, real_world, study_guide,
        /// quiz_prep
        #[structopt(long)]
        context: Option<ContextType>,

        /// Continue a saved conversation (sent as history)
        #[structopt(long = "--continue")]
        continue_id: Option<String>,
    },
    History,
    Load {
        id: String,
    },
    /// Save a conversation; reads a JSON array of messages from stdin
    Save {
        #[structopt(long)]
        title: String,
    },
    /// Feedback on a quiz attempt
    Feedback {
        fields: Vec<ArgField>,
    },
}

#[derive(StructOpt)]
enum TeacherCommand {
    Dashboard,
    Courses,
    Course {
        id: String,
    },
    CreateCourse {
        fields: Vec<ArgField>,
    },
    UpdateCourse {
        id: String,
        fields: Vec<ArgField>,
    },
    DeleteCourse {
        id: String,
    },
    Lesson {
        id: String,
    },
    /// Upload a new lesson as a multipart form
    CreateLesson {
        #[structopt(long, parse(from_os_str))]
        file: Option<PathBuf>,

        #[structopt(long, default_value = "file")]
        file_field: String,

        fields: Vec<ArgField>,
    },
    UpdateLesson {
        id: String,

        #[structopt(long, parse(from_os_str))]
        file: Option<PathBuf>,

        #[structopt(long, default_value = "file")]
        file_field: String,

        fields: Vec<ArgField>,
    },
    DeleteLesson {
        id: String,
    },
    Quiz {
        id: String,
    },
    CreateQuiz {
        fields: Vec<ArgField>,
    },
    UpdateQuiz {
        id: String,
        fields: Vec<ArgField>,
    },
    DeleteQuiz {
        id: String,
    },
    GenerateQuiz {
        fields: Vec<ArgField>,
    },
    Analytics {
        course_id: String,
    },
}

#[derive(StructOpt)]
enum AdminCommand {
    Dashboard,
    Users,
    CreateUser {
        fields: Vec<ArgField>,
    },
    UpdateUser {
        id: String,
        fields: Vec<ArgField>,
    },
    DeleteUser {
        id: String,
    },
    Analytics {
        #[structopt(long, default_value = "30d")]
        range: String,
    },
    Reports,
    UploadReport {
        #[structopt(parse(from_os_str))]
        file: PathBuf,

        #[structopt(long, default_value = "file")]
        file_field: String,

        fields: Vec<ArgField>,
    },
}

#[derive(StructOpt)]
enum SupportCommand {
    Info,
    Ticket { fields: Vec<ArgField> },
}

#[derive(StructOpt)]
enum Command {
    /// Student dashboard, recommendations, and top of the leaderboard
    Dashboard,

    Courses {
        #[structopt(subcommand)]
        cmd: CourseCommand,
    },

    Lesson {
        id: String,
    },

    Leaderboard {
        #[structopt(long)]
        course: Option<String>,

        #[structopt(long)]
        limit: Option<u32>,
    },

    Quizzes,
    QuizAttempts,
    Badges,
    Xp,
    Achievements,

    Tutor {
        #[structopt(subcommand)]
        cmd: TutorCommand,
    },

    /// Sub-commands for managing account
    Account {
        #[structopt(subcommand)]
        cmd: AccountCommand,
    },

    Teacher {
        #[structopt(subcommand)]
        cmd: TeacherCommand,
    },

    Admin {
        #[structopt(subcommand)]
        cmd: AdminCommand,
    },

    Support {
        #[structopt(subcommand)]
        cmd: SupportCommand,
    },

    /// Raw API call, eg: `lectern api get /courses` or `lectern api post /support/ticket subject=x`
    Api {
        #[structopt(parse(try_from_str = parse_method))]
        method: Method,
        path: String,
        fields: Vec<ArgField>,
    },

    /// Summarize configuration and local session
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = match opt.verbose {
        std::i8::MIN..=-1 => "none",
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        4..=std::i8::MAX => "trace",
    };
    // hyper logging is very verbose, so crank that down even if everything else is more verbose
    let log_filter = format!("{},hyper=error", log_level);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter))
        .format_timestamp(None)
        .init();

    debug!("Args parsed, starting up");

    #[cfg(windows)]
    colored_json::enable_ansi_support();

    if let Some(shell) = opt.shell_completions {
        Opt::clap().gen_completions_to("lectern", shell, &mut std::io::stdout());
        std::process::exit(0);
    }

    if let Err(err) = run(opt) {
        // Be graceful about some errors
        if let Some(io_err) = err.root_cause().downcast_ref::<std::io::Error>() {
            if let std::io::ErrorKind::BrokenPipe = io_err.kind() {
                // presumably due to something like writing to stdout and piped to `head -n10` and
                // stdout was closed
                debug!("got BrokenPipe error, assuming stdout closed as expected and exiting with success");
                std::process::exit(0);
            }
        }
        let mut color_stderr = StandardStream::stderr(if atty::is(atty::Stream::Stderr) {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        });
        color_stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        eprintln!("Error: {:?}", err);
        color_stderr.set_color(&ColorSpec::new())?;
        if let Some(api_err) = err.downcast_ref::<ApiError>() {
            if api_err.is_unauthorized() {
                eprintln!("hint: session missing or expired, try `lectern account login`");
            } else if api_err.is_invalid_request() {
                eprintln!("hint: the request was rejected before sending; check headers and fields");
            } else if api_err.is_network() {
                eprintln!("hint: is the API reachable at the configured --api-url?");
            }
        }
        std::process::exit(1);
    }
    Ok(())
}

fn print_result_json(result: Option<Value>) -> Result<()> {
    if let Some(val) = result {
        writeln!(&mut std::io::stdout(), "{}", to_colored_json_auto(&val)?)?
    };
    Ok(())
}

fn run(opt: Opt) -> Result<()> {
    // every API call is awaited on this one thread
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run_command(opt))
}

async fn run_command(opt: Opt) -> Result<()> {
    let state_dir = opt.state_dir.clone().unwrap_or_else(FileStorage::default_dir);
    let session = SessionStore::new(Arc::new(FileStorage::new(&state_dir)));
    let _transitions = session.subscribe(|s| {
        debug!(
            "session state: authenticated={} loading={}",
            s.is_authenticated, s.is_loading
        )
    });
    session.init();
    let api = ApiClient::new(
        ApiConfig::from_setting(opt.api_url.as_deref()),
        session.clone(),
    )?;

    let result = match opt.cmd {
        Command::Status => {
            pp_status(api.base_url(), &state_dir, &session.snapshot())?;
            None
        }
        Command::Dashboard => {
            let (dashboard, recommendations, leaderboard) = futures::try_join!(
                api.get_student_dashboard(),
                api.get_recommendations(),
                api.get_leaderboard(None, Some(5)),
            )?;
            Some(json!({
                "dashboard": dashboard,
                "recommendations": recommendations,
                "leaderboard": leaderboard,
            }))
        }
        Command::Courses { cmd } => Some(match cmd {
            CourseCommand::List => api.get_courses().await?,
            CourseCommand::Get { id } => api.get_course(&id).await?,
            CourseCommand::Enroll { id } => api.enroll_in_course(&id).await?,
            CourseCommand::Progress => api.get_student_progress().await?,
        }),
        Command::Lesson { id } => Some(api.get_lesson(&id).await?),
        Command::Leaderboard { course, limit } => {
            Some(api.get_leaderboard(course.as_deref(), limit).await?)
        }
        Command::Quizzes => Some(api.get_upcoming_quizzes().await?),
        Command::QuizAttempts => Some(api.get_quiz_attempts().await?),
        Command::Badges => Some(api.get_badges().await?),
        Command::Xp => Some(api.get_xp_progress().await?),
        Command::Achievements => Some(api.get_achievements().await?),
        Command::Tutor { cmd } => run_tutor(&api, cmd).await?,
        Command::Account { cmd } => run_account(&api, &session, &state_dir, cmd).await?,
        Command::Teacher { cmd } => Some(run_teacher(&api, cmd).await?),
        Command::Admin { cmd } => Some(run_admin(&api, cmd).await?),
        Command::Support { cmd } => Some(match cmd {
            SupportCommand::Info => api.get_support_data().await?,
            SupportCommand::Ticket { fields } => {
                api.submit_support_ticket(&value_from_fields(fields))
                    .await?
            }
        }),
        Command::Api {
            method,
            path,
            fields,
        } => {
            let path = path_with_query(&path, &fields);
            let mut options = RequestOptions::new(method.clone());
            if method != Method::GET && method != Method::HEAD {
                options = options.json(value_from_fields(fields));
            }
            Some(api.dispatch(&path, options).await?)
        }
    };
    print_result_json(result)?;
    Ok(())
}

async fn run_account(
    api: &ApiClient,
    session: &SessionStore,
    state_dir: &Path,
    cmd: AccountCommand,
) -> Result<Option<Value>> {
    let maybe_hash = |password: String, prehash: bool| {
        if prehash {
            hash_password(&password)
        } else {
            password
        }
    };
    let result = match cmd {
        AccountCommand::Register {
            name,
            mail,
            password,
            prehash,
        } => Some(
            api.register(&SignupRequest {
                name,
                mail,
                password: maybe_hash(password, prehash),
            })
            .await?,
        ),
        AccountCommand::Login {
            mail,
            name,
            password,
            prehash,
        } => {
            if mail.is_none() && name.is_none() {
                return Err(anyhow!("expected --mail or --name to log in"));
            }
            let creds = Credentials {
                mail,
                name,
                password: maybe_hash(password, prehash),
            };
            session.set_loading(true);
            let resp = api.login(&creds).await;
            session.set_loading(false);
            let identity = resp?;
            if identity["token"].as_str().map_or(true, |t| t.is_empty()) {
                warn!("login response carried no token; later requests will be anonymous");
            }
            session.login(identity);
            pp_status(api.base_url(), state_dir, &session.snapshot())?;
            None
        }
        AccountCommand::Logout => {
            if session.snapshot().is_authenticated {
                if let Err(e) = api.logout().await {
                    warn!("server-side logout failed, clearing local session anyway: {e}");
                }
            }
            session.logout();
            None
        }
        AccountCommand::Profile => Some(api.get_profile().await?),
        AccountCommand::UpdateProfile { fields } => {
            Some(api.update_profile(&value_from_fields(fields)).await?)
        }
        AccountCommand::StudentProfile => Some(api.get_student_profile().await?),
        AccountCommand::UpdateStudentProfile { fields } => Some(
            api.update_student_profile(&value_from_fields(fields))
                .await?,
        ),
        AccountCommand::Settings => Some(api.get_user_settings().await?),
        AccountCommand::UpdateSettings { fields } => Some(
            api.update_user_settings(&value_from_fields(fields))
                .await?,
        ),
        AccountCommand::ChangePassword { fields } => {
            Some(api.change_password(&value_from_fields(fields)).await?)
        }
    };
    Ok(result)
}

async fn run_tutor(api: &ApiClient, cmd: TutorCommand) -> Result<Option<Value>> {
    match cmd {
        TutorCommand::Ask {
            message,
            context,
            continue_id,
        } => {
            let history = match continue_id {
                Some(id) => {
                    let conv: Conversation =
                        serde_json::from_value(api.load_ai_tutor_conversation(&id).await?)?;
                    Some(conv.messages)
                }
                None => None,
            };
            let request = TutorChatRequest {
                message,
                context: context.map(|c| ChatContext {
                    contextType: Some(c.to_string()),
                }),
                conversationHistory: history,
            };
            let resp = api.ask_ai_tutor(&request).await?;
            match serde_json::from_value::<TutorChatReply>(resp.clone()) {
                Ok(reply) => {
                    pp_tutor_reply(&reply)?;
                    Ok(None)
                }
                Err(_) => Ok(Some(resp)),
            }
        }
        TutorCommand::History => {
            let resp = api.get_ai_tutor_history().await?;
            match serde_json::from_value::<HistoryResponse>(resp.clone()) {
                Ok(history) => {
                    pp_history(&history)?;
                    Ok(None)
                }
                Err(_) => Ok(Some(resp)),
            }
        }
        TutorCommand::Load { id } => {
            let resp = api.load_ai_tutor_conversation(&id).await?;
            match serde_json::from_value::<Conversation>(resp.clone()) {
                Ok(conv) => {
                    pp_conversation(&conv)?;
                    Ok(None)
                }
                Err(_) => Ok(Some(resp)),
            }
        }
        TutorCommand::Save { title } => {
            let messages: Vec<ChatMessage> = serde_json::from_reader(std::io::stdin())?;
            let resp = api
                .save_ai_tutor_conversation(&SaveConversationRequest { title, messages })
                .await?;
            Ok(Some(resp))
        }
        TutorCommand::Feedback { fields } => {
            Ok(Some(api.get_ai_feedback(&value_from_fields(fields)).await?))
        }
    }
}

async fn run_teacher(api: &ApiClient, cmd: TeacherCommand) -> Result<Value> {
    let val = match cmd {
        TeacherCommand::Dashboard => api.get_teacher_dashboard().await?,
        TeacherCommand::Courses => api.get_teacher_courses().await?,
        TeacherCommand::Course { id } => api.get_teacher_course(&id).await?,
        TeacherCommand::CreateCourse { fields } => {
            api.create_teacher_course(&value_from_fields(fields))
                .await?
        }
        TeacherCommand::UpdateCourse { id, fields } => {
            // fetch existing, extend map with fields, put the updated value
            let mut course = api.get_teacher_course(&id).await?;
            if !course.is_object() {
                course = json!({});
            }
            update_value_from_fields(fields, &mut course);
            api.update_teacher_course(&id, &course).await?
        }
        TeacherCommand::DeleteCourse { id } => api.delete_teacher_course(&id).await?,
        TeacherCommand::Lesson { id } => api.get_teacher_lesson(&id).await?,
        TeacherCommand::CreateLesson {
            file,
            file_field,
            fields,
        } => {
            let form = form_from_fields(fields, file.as_deref(), &file_field)?;
            api.create_teacher_lesson(form).await?
        }
        TeacherCommand::UpdateLesson {
            id,
            file,
            file_field,
            fields,
        } => {
            let form = form_from_fields(fields, file.as_deref(), &file_field)?;
            api.update_teacher_lesson(&id, form).await?
        }
        TeacherCommand::DeleteLesson { id } => api.delete_teacher_lesson(&id).await?,
        TeacherCommand::Quiz { id } => api.get_teacher_quiz(&id).await?,
        TeacherCommand::CreateQuiz { fields } => {
            api.create_teacher_quiz(&value_from_fields(fields)).await?
        }
        TeacherCommand::UpdateQuiz { id, fields } => {
            api.update_teacher_quiz(&id, &value_from_fields(fields))
                .await?
        }
        TeacherCommand::DeleteQuiz { id } => api.delete_teacher_quiz(&id).await?,
        TeacherCommand::GenerateQuiz { fields } => {
            api.generate_quiz_with_ai(&value_from_fields(fields))
                .await?
        }
        TeacherCommand::Analytics { course_id } => api.get_teacher_analytics(&course_id).await?,
    };
    Ok(val)
}

async fn run_admin(api: &ApiClient, cmd: AdminCommand) -> Result<Value> {
    let val = match cmd {
        AdminCommand::Dashboard => api.get_admin_dashboard().await?,
        AdminCommand::Users => api.get_admin_users().await?,
        AdminCommand::CreateUser { fields } => {
            api.create_admin_user(&value_from_fields(fields)).await?
        }
        AdminCommand::UpdateUser { id, fields } => {
            api.update_admin_user(&id, &value_from_fields(fields))
                .await?
        }
        AdminCommand::DeleteUser { id } => api.delete_admin_user(&id).await?,
        AdminCommand::Analytics { range } => api.get_platform_analytics(&range).await?,
        AdminCommand::Reports => api.get_hotjar_reports().await?,
        AdminCommand::UploadReport {
            file,
            file_field,
            fields,
        } => {
            let form = form_from_fields(fields, Some(&file), &file_field)?;
            api.upload_hotjar_report(form).await?
        }
    };
    Ok(val)
}
