use clap::{Parser, Subcommand};
use simrs_core::access::authorize;
use simrs_core::config::{clinic_offset_from_env_value, payment_ceiling_from_env_value};
use simrs_core::constants::DEFAULT_DATA_DIR;
use simrs_core::{
    Access, CoreConfig, NewPatient, NewUser, Page, PatientService, ReportService, Role,
    StoreKind, TableStore, UserService, VisitService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "simrs")]
#[command(about = "SIMRS front desk admin CLI")]
struct Cli {
    /// Directory holding the table files
    #[arg(long, env = "SIMRS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients, or search them
    Patients {
        /// Case-insensitive search over name, NIK, phone and address
        #[arg(long)]
        search: Option<String>,
    },
    /// Register a patient
    RegisterPatient {
        name: String,
        #[arg(long)]
        nik: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List visits with their payment state
    Visits,
    /// List user accounts
    Users,
    /// Create a user account
    CreateUser {
        username: String,
        password: String,
        /// Display name
        name: String,
        /// One of super_admin, admin, staff_pendaftaran, dokter, kasir, manajemen, apoteker
        role: String,
    },
    /// Delete a user account
    DeleteUser {
        /// User id
        id: String,
    },
    /// Print the management summary
    Report,
    /// Show whether a role may open a page
    Authorize {
        role: String,
        /// Page name or path, e.g. `billing` or `/billing`
        page: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'simrs --help' for commands");
        return Ok(());
    };

    let data_dir = cli.data_dir;
    let open = || -> anyhow::Result<(Arc<CoreConfig>, Arc<TableStore>)> {
        let cfg = CoreConfig::new(
            data_dir.clone(),
            StoreKind::File,
            payment_ceiling_from_env_value(std::env::var("SIMRS_PAYMENT_CEILING").ok())?,
            clinic_offset_from_env_value(std::env::var("SIMRS_UTC_OFFSET").ok())?,
        )?;
        Ok((Arc::new(cfg), Arc::new(TableStore::open(&data_dir)?)))
    };

    match command {
        Commands::Patients { search } => {
            let (_, store) = open()?;
            let service = PatientService::new(store);
            let patients = match search {
                Some(q) => service.search(&q)?,
                None => service.list()?,
            };
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in patients {
                println!(
                    "ID: {}, Name: {}, NIK: {}, Created: {}",
                    p.id,
                    p.name,
                    p.nik.as_deref().unwrap_or("-"),
                    p.created_at
                );
            }
        }
        Commands::RegisterPatient {
            name,
            nik,
            phone,
            address,
        } => {
            let (_, store) = open()?;
            let patient = PatientService::new(store).register(NewPatient {
                name,
                nik,
                phone,
                address,
            })?;
            println!("Registered patient with ID: {}", patient.id);
        }
        Commands::Visits => {
            let (cfg, store) = open()?;
            let visits = VisitService::new(cfg, store).overviews()?;
            if visits.is_empty() {
                println!("No visits found.");
            }
            for v in visits {
                let paid: u64 = v
                    .transactions
                    .iter()
                    .filter(|t| t.is_paid())
                    .map(|t| t.amount)
                    .sum();
                println!(
                    "ID: {}, Patient: {}, Doctor: {}, Status: {}, Paid: {}, Created: {}",
                    v.visit.id, v.patient_name, v.visit.doctor, v.visit.status, paid, v.visit.created_at
                );
            }
        }
        Commands::Users => {
            let (_, store) = open()?;
            for u in UserService::new(store).list()? {
                println!(
                    "ID: {}, Username: {}, Name: {}, Role: {}",
                    u.id, u.username, u.name, u.role
                );
            }
        }
        Commands::CreateUser {
            username,
            password,
            name,
            role,
        } => {
            let (_, store) = open()?;
            let user = UserService::new(store).create(NewUser {
                username,
                password,
                name,
                role,
            })?;
            println!("Created user {} with ID: {}", user.username, user.id);
        }
        Commands::DeleteUser { id } => {
            let id = simrs_core::validation::required_id("id", &id)?;
            let (_, store) = open()?;
            UserService::new(store).delete(id)?;
            println!("Deleted user {}", id);
        }
        Commands::Report => {
            let (cfg, store) = open()?;
            let s = ReportService::new(cfg, store).summary()?;
            println!("Date:            {}", s.date);
            println!("Total patients:  {}", s.total_patients);
            println!("Total visits:    {}", s.total_visits);
            println!("Visits today:    {}", s.visits_today);
            println!("Revenue (paid):  {}", s.total_revenue);
            println!("Revenue today:   {}", s.revenue_today);
            let c = s.status_counts;
            println!(
                "By status:       registered {}, in_consultation {}, closed {}, paid {}",
                c.registered, c.in_consultation, c.closed, c.paid
            );
        }
        Commands::Authorize { role, page } => {
            let role: Role = role.parse()?;
            let page: Page = page.parse()?;
            match authorize(role, page) {
                Access::Allow => println!("{role} may open {page}"),
                Access::Redirect(to) => {
                    println!("{role} may not open {page}; redirect to {}", to.path())
                }
            }
        }
    }

    Ok(())
}
