use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use organlink_client::application::payload::{RequestDetails, encode_request_payload};
use organlink_client::application::validation::{
    DonorProfileForm, LoginForm, RegisterForm, RequestForm,
};
use organlink_client::domain::matching::{DonorFilter, RequestFilter};
use organlink_client::infrastructure::config::AppConfig;
use organlink_client::infrastructure::logging::init_logging;
use organlink_client::infrastructure::security::JwtKeys;
use organlink_client::infrastructure::session::SessionFile;
use organlink_client::{
    AuthService, Availability, DomainError, DonorDirectory, DonorService, HospitalDashboard,
    JsonFileStore, LocalIdentityProvider, RequestBoard, RequestService, RequestStatus,
    StoreRequestRepository, StoreUserRepository, Urgency, UserAccount,
};
use tracing::info;

type Auth = AuthService<LocalIdentityProvider<JsonFileStore>, StoreUserRepository<JsonFileStore>>;

#[derive(Parser, Debug)]
#[clap(name = "organlink", about = "Donor and organ request matching")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    Register {
        #[clap(long)]
        email: String,
        #[clap(long)]
        full_name: String,
        #[clap(long)]
        password: String,
        #[clap(long)]
        confirm_password: String,
    },
    Login {
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    Logout,
    Whoami,
    /// Save the donor profile of the signed-in user.
    BecomeDonor {
        #[clap(long)]
        full_name: String,
        #[clap(long)]
        blood_type: String,
        #[clap(long = "organ")]
        organs: Vec<String>,
        #[clap(long)]
        location: String,
        #[clap(long)]
        last_checkup: String,
        #[clap(long, default_value = "available")]
        status: Availability,
    },
    SetAvailability {
        status: Availability,
    },
    Donors {
        #[clap(long)]
        blood_type: Option<String>,
        #[clap(long)]
        organ: Option<String>,
        #[clap(long)]
        search: Option<String>,
    },
    Requests {
        #[clap(long)]
        blood_type: Option<String>,
        #[clap(long)]
        organ: Option<String>,
        #[clap(long)]
        urgency: Option<Urgency>,
        #[clap(long)]
        search: Option<String>,
    },
    MyRequests,
    /// Submit a new organ request as the signed-in user.
    Request {
        #[clap(long)]
        full_name: String,
        #[clap(long)]
        age: String,
        #[clap(long)]
        contact_number: String,
        #[clap(long)]
        hospital_name: String,
        #[clap(long)]
        hospital_address: String,
        #[clap(long)]
        organ_type: String,
        #[clap(long)]
        blood_type: String,
        #[clap(long, default_value = "medium")]
        urgency: Urgency,
        #[clap(long)]
        urgent: bool,
        #[clap(long, default_value = "")]
        additional_info: String,
    },
    /// List available donors compatible with a request.
    Match {
        id: String,
    },
    Advance {
        id: String,
        status: RequestStatus,
    },
    Dashboard,
    /// Decode a request details payload, or build one from a stored request.
    Details {
        #[clap(long, conflicts_with = "id")]
        payload: Option<String>,
        #[clap(long)]
        id: Option<String>,
    },
}

fn signed_in(auth: &Auth) -> Result<UserAccount, DomainError> {
    auth.current_user().ok_or(DomainError::NotSignedIn)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Cli::parse();
    let config = AppConfig::from_env()?;

    let store = Arc::new(
        JsonFileStore::open(&config.data_file)
            .await
            .with_context(|| format!("failed to open {}", config.data_file.display()))?,
    );
    let keys = JwtKeys::new(config.jwt_secret.clone(), config.session_ttl());
    let identity = Arc::new(LocalIdentityProvider::new(Arc::clone(&store), keys));
    let users = Arc::new(StoreUserRepository::new(Arc::clone(&store)));
    let requests = Arc::new(StoreRequestRepository::new(Arc::clone(&store)));

    let auth = AuthService::new(
        identity,
        Arc::clone(&users),
        Some(SessionFile::new(&config.session_file)),
    );
    auth.restore().await?;
    info!(data_file = %config.data_file.display(), "store opened");

    match args.command {
        Command::Register {
            email,
            full_name,
            password,
            confirm_password,
        } => {
            RegisterForm {
                full_name: full_name.clone(),
                email: email.clone(),
                password: password.clone(),
                confirm_password,
            }
            .validate()?;
            let account = auth.register(&email, &password, &full_name).await?;
            println!("Registered {}", account);
        }
        Command::Login { email, password } => {
            LoginForm {
                email: email.clone(),
                password: password.clone(),
            }
            .validate()?;
            match auth.login(&email, &password).await? {
                Some(account) => println!("Logged in as {}", account),
                None => println!("Logged in as {} (no account data)", email),
            }
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match auth.current_user() {
            Some(account) => {
                println!("{}", account);
                println!("id: {}", account.id);
                println!("donor: {}", if account.is_donor { "yes" } else { "no" });
            }
            None => println!("Not logged in"),
        },
        Command::BecomeDonor {
            full_name,
            blood_type,
            organs,
            location,
            last_checkup,
            status,
        } => {
            let mut form = DonorProfileForm {
                full_name,
                blood_type,
                location,
                last_checkup,
                status,
                ..DonorProfileForm::default()
            };
            for organ in &organs {
                form.toggle_organ(organ);
            }
            let account = auth.become_donor(&form).await?;
            println!("Donor profile saved for {}", account);
        }
        Command::SetAvailability { status } => {
            let account = signed_in(&auth)?;
            DonorService::new(users)
                .set_availability(&account.id, status)
                .await?;
            println!("Availability set to {}", status);
        }
        Command::Donors {
            blood_type,
            organ,
            search,
        } => {
            let mut directory = DonorDirectory::subscribe(users).await?;
            directory.ready().await?;
            let donors = directory.filtered(&DonorFilter {
                blood_type,
                organ_type: organ,
                search_query: search,
            });
            println!("Donors ({})", donors.len());
            for donor in donors {
                println!("- [{}] {}", donor.id(), donor);
            }
        }
        Command::Requests {
            blood_type,
            organ,
            urgency,
            search,
        } => {
            let mut board = RequestBoard::subscribe(requests).await?;
            board.ready().await?;
            let found = board.filtered(&RequestFilter {
                blood_type,
                organ_type: organ,
                urgency,
                search_query: search,
            });
            println!("Requests ({})", found.len());
            for request in found {
                println!("- [{}] {}", request.id, request);
            }
        }
        Command::MyRequests => {
            let account = signed_in(&auth)?;
            let mut board = RequestBoard::subscribe(requests).await?;
            board.ready().await?;
            let mine = board.user_requests(&account.id);
            println!("Your requests ({})", mine.len());
            for request in mine {
                println!("- [{}] {}", request.id, request);
            }
        }
        Command::Request {
            full_name,
            age,
            contact_number,
            hospital_name,
            hospital_address,
            organ_type,
            blood_type,
            urgency,
            urgent,
            additional_info,
        } => {
            let account = signed_in(&auth)?;
            let form = RequestForm {
                full_name,
                age,
                contact_number,
                hospital_name,
                hospital_address,
                organ_type,
                blood_type,
                urgency_level: urgency,
                is_urgent: urgent,
                additional_info,
            };
            let request = RequestService::new(requests)
                .create_request(form.validate(&account.id)?)
                .await?;
            println!("Request created! ID: {}", request.id);
        }
        Command::Match { id } => {
            let mut board = RequestBoard::subscribe(requests).await?;
            let mut directory = DonorDirectory::subscribe(users).await?;
            board.ready().await?;
            directory.ready().await?;
            let donors = board.matching_donors(&id, &directory.donors())?;
            println!("Matching donors ({})", donors.len());
            for donor in donors {
                println!("- [{}] {}", donor.id(), donor);
            }
        }
        Command::Advance { id, status } => {
            let request = RequestService::new(requests)
                .advance_request_status(&id, status)
                .await?;
            println!("Request updated: {}", request);
        }
        Command::Dashboard => {
            let mut board = RequestBoard::subscribe(requests).await?;
            let mut directory = DonorDirectory::subscribe(users).await?;
            board.ready().await?;
            directory.ready().await?;
            let dashboard = HospitalDashboard::build(&board.requests(), &directory.donors());
            println!(
                "Donors: {}  Requests: {}  Pending: {}  Matched: {}  Completed: {}",
                dashboard.donor_count,
                dashboard.request_count,
                dashboard.stats.pending,
                dashboard.stats.matched,
                dashboard.stats.completed
            );
            for entry in dashboard.entries {
                println!("- [{}] {}", entry.request.id, entry.request);
                for donor in entry.donors {
                    println!("    {}", donor);
                }
            }
        }
        Command::Details { payload, id } => {
            let payload = match (payload, id) {
                (Some(payload), _) => Some(payload),
                (None, Some(id)) => {
                    let mut board = RequestBoard::subscribe(requests).await?;
                    board.ready().await?;
                    let request = board
                        .find(&id)
                        .ok_or_else(|| DomainError::RequestNotFound(id.clone()))?;
                    Some(encode_request_payload(&request)?)
                }
                (None, None) => None,
            };
            match RequestDetails::from_payload(payload.as_deref()) {
                RequestDetails::Ready(request) => {
                    println!("{}", request);
                    println!("{}", serde_json::to_string_pretty(&request)?);
                }
                RequestDetails::Loading => println!("Loading..."),
            }
        }
    }

    Ok(())
}
