//! Command-line front end for the class manager.
//!
//! # Responsibility
//! - Parse commands and forward them to `ClassManager`.
//! - Render outcomes as text or JSON and map them to exit codes.
//!
//! Exit codes: `0` success, `1` rejected operation, `2` configuration or
//! database failure.

use classmanager_core::{
    core_version, default_log_level, init_logging, AppConfig, ClassManager, Course, CoursePatch,
    OpOutcome, ReconcileMode, ReconcileReport, SessionError, Student, StudentPatch, Teacher,
    TeacherPatch,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "classmanager")]
#[command(about = "Manage students, teachers, courses and their links")]
struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the core version.
    Version,
    #[command(flatten)]
    Data(DataCommand),
}

/// Commands that need a database session.
#[derive(Subcommand)]
enum DataCommand {
    /// Show record counts per collection.
    Dashboard,
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },
    Teacher {
        #[command(subcommand)]
        command: TeacherCommand,
    },
    Course {
        #[command(subcommand)]
        command: CourseCommand,
    },
    /// Assign a teacher to a course.
    Assign {
        teacher_id: String,
        course_code: String,
    },
    /// Clear a course's teacher.
    Unassign { course_code: String },
    /// Enroll a student in a course.
    Enroll {
        student_id: String,
        course_code: String,
    },
    /// Remove a student from a course.
    Unenroll {
        student_id: String,
        course_code: String,
    },
    /// Find and repair broken cross-references.
    Reconcile {
        /// Report findings without writing repairs.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum StudentCommand {
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        grade: u32,
    },
    List,
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        grade: Option<u32>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum TeacherCommand {
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        specialization: String,
    },
    List,
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum CourseCommand {
    Add {
        #[arg(long)]
        code: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        schedule: String,
    },
    List,
    Update {
        code: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        schedule: Option<String>,
    },
    Delete {
        code: String,
    },
}

enum Rendered {
    Outcome(OpOutcome),
    Data { text: String, json: Value },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let command = match cli.command {
        Command::Version => {
            print_value(
                cli.json,
                &format!("classmanager {}", core_version()),
                json!({ "version": core_version() }),
            );
            return ExitCode::SUCCESS;
        }
        Command::Data(command) => command,
    };

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => return report_session_error(cli.json, &SessionError::from(err)),
    };
    start_logging(&config);

    let mut manager = match ClassManager::connect(config) {
        Ok(manager) => manager,
        Err(err) => return report_session_error(cli.json, &err),
    };

    match run(&mut manager, command) {
        Ok(Rendered::Outcome(outcome)) => {
            print_value(
                cli.json,
                &outcome.message,
                json!({ "success": outcome.success, "message": outcome.message }),
            );
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Ok(Rendered::Data { text, json }) => {
            print_value(cli.json, &text, json);
            ExitCode::SUCCESS
        }
        Err(err) => report_session_error(cli.json, &err),
    }
}

fn run(manager: &mut ClassManager, command: DataCommand) -> Result<Rendered, SessionError> {
    let rendered = match command {
        DataCommand::Dashboard => {
            let counts = manager.dashboard()?;
            Rendered::Data {
                text: format!(
                    "students: {}\nteachers: {}\ncourses: {}",
                    counts.students, counts.teachers, counts.courses
                ),
                json: json!({
                    "students": counts.students,
                    "teachers": counts.teachers,
                    "courses": counts.courses,
                }),
            }
        }
        DataCommand::Student { command } => run_student(manager, command)?,
        DataCommand::Teacher { command } => run_teacher(manager, command)?,
        DataCommand::Course { command } => run_course(manager, command)?,
        DataCommand::Assign {
            teacher_id,
            course_code,
        } => Rendered::Outcome(manager.assign_teacher(&teacher_id, &course_code)?),
        DataCommand::Unassign { course_code } => {
            Rendered::Outcome(manager.unassign_teacher(&course_code)?)
        }
        DataCommand::Enroll {
            student_id,
            course_code,
        } => Rendered::Outcome(manager.enroll_student(&student_id, &course_code)?),
        DataCommand::Unenroll {
            student_id,
            course_code,
        } => Rendered::Outcome(manager.unenroll_student(&student_id, &course_code)?),
        DataCommand::Reconcile { dry_run } => {
            let mode = if dry_run {
                ReconcileMode::DryRun
            } else {
                ReconcileMode::Repair
            };
            render_report(mode, &manager.reconcile(mode)?)
        }
    };
    Ok(rendered)
}

fn run_student(
    manager: &mut ClassManager,
    command: StudentCommand,
) -> Result<Rendered, SessionError> {
    Ok(match command {
        StudentCommand::Add {
            id,
            name,
            email,
            grade,
        } => Rendered::Outcome(manager.create_student(&Student::new(id, name, email, grade))?),
        StudentCommand::List => {
            let students = manager.read_students()?;
            let text = students
                .iter()
                .map(|s| {
                    format!(
                        "{}\t{}\t{}\tgrade {}\t[{}]",
                        s.student_id,
                        s.name,
                        s.email,
                        s.grade_level,
                        s.enrollments.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Rendered::Data {
                text,
                json: list_json(&students),
            }
        }
        StudentCommand::Update {
            id,
            name,
            email,
            grade,
        } => {
            let patch = StudentPatch {
                name,
                email,
                grade_level: grade,
            };
            Rendered::Outcome(manager.update_student(&id, &patch)?)
        }
        StudentCommand::Delete { id } => Rendered::Outcome(manager.delete_student(&id)?),
    })
}

fn run_teacher(
    manager: &mut ClassManager,
    command: TeacherCommand,
) -> Result<Rendered, SessionError> {
    Ok(match command {
        TeacherCommand::Add {
            id,
            name,
            email,
            specialization,
        } => Rendered::Outcome(
            manager.create_teacher(&Teacher::new(id, name, email, specialization))?,
        ),
        TeacherCommand::List => {
            let teachers = manager.read_teachers()?;
            let text = teachers
                .iter()
                .map(|t| {
                    format!(
                        "{}\t{}\t{}\t{}\t[{}]",
                        t.teacher_id,
                        t.name,
                        t.email,
                        t.specialization,
                        t.courses.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Rendered::Data {
                text,
                json: list_json(&teachers),
            }
        }
        TeacherCommand::Update {
            id,
            name,
            email,
            specialization,
        } => {
            let patch = TeacherPatch {
                name,
                email,
                specialization,
            };
            Rendered::Outcome(manager.update_teacher(&id, &patch)?)
        }
        TeacherCommand::Delete { id } => Rendered::Outcome(manager.delete_teacher(&id)?),
    })
}

fn run_course(
    manager: &mut ClassManager,
    command: CourseCommand,
) -> Result<Rendered, SessionError> {
    Ok(match command {
        CourseCommand::Add {
            code,
            title,
            schedule,
        } => Rendered::Outcome(manager.create_course(&Course::new(code, title, schedule))?),
        CourseCommand::List => {
            let courses = manager.read_courses()?;
            let text = courses
                .iter()
                .map(|c| {
                    format!(
                        "{}\t{}\t{}\tteacher {}\t[{}]",
                        c.course_code,
                        c.title,
                        c.schedule,
                        c.teacher_id.as_deref().unwrap_or("-"),
                        c.students.join(", ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Rendered::Data {
                text,
                json: list_json(&courses),
            }
        }
        CourseCommand::Update {
            code,
            title,
            schedule,
        } => {
            let patch = CoursePatch { title, schedule };
            Rendered::Outcome(manager.update_course(&code, &patch)?)
        }
        CourseCommand::Delete { code } => Rendered::Outcome(manager.delete_course(&code)?),
    })
}

fn render_report(mode: ReconcileMode, report: &ReconcileReport) -> Rendered {
    let verb = match mode {
        ReconcileMode::DryRun => "found",
        ReconcileMode::Repair => "repaired",
    };
    Rendered::Data {
        text: format!(
            "{verb} {} inconsistencies\n\
             dangling course teachers: {}\n\
             missing teacher courses: {}\n\
             dangling teacher courses: {}\n\
             dangling course students: {}\n\
             dangling enrollments: {}\n\
             half enrollments: {}\n\
             duplicate list entries: {}",
            report.total(),
            report.dangling_course_teachers,
            report.missing_teacher_courses,
            report.dangling_teacher_courses,
            report.dangling_course_students,
            report.dangling_enrollments,
            report.half_enrollments,
            report.duplicate_list_entries,
        ),
        json: json!({
            "mode": verb,
            "total": report.total(),
            "dangling_course_teachers": report.dangling_course_teachers,
            "missing_teacher_courses": report.missing_teacher_courses,
            "dangling_teacher_courses": report.dangling_teacher_courses,
            "dangling_course_students": report.dangling_course_students,
            "dangling_enrollments": report.dangling_enrollments,
            "half_enrollments": report.half_enrollments,
            "duplicate_list_entries": report.duplicate_list_entries,
        }),
    }
}

fn list_json<T: serde::Serialize>(records: &[T]) -> Value {
    serde_json::to_value(records).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}

fn start_logging(config: &AppConfig) {
    let Some(log_dir) = config.log_dir.as_ref() else {
        return;
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir.clone()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(log_dir))
            .unwrap_or_else(|_| PathBuf::from(log_dir))
    };
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, &log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn print_value(as_json: bool, text: &str, value: Value) {
    if as_json {
        println!("{value}");
    } else if !text.is_empty() {
        println!("{text}");
    }
}

fn report_session_error(as_json: bool, err: &SessionError) -> ExitCode {
    if as_json {
        println!("{}", json!({ "success": false, "message": err.to_string() }));
    } else {
        eprintln!("error: {err}");
    }
    ExitCode::from(2)
}
