#!/usr/bin/env cargo
//! Sample Tracker Database Seeder
//!
//! Fills a running Sample Tracker API with demo data through its HTTP
//! interface: samples at every lifecycle stage, chemical requests and
//! customer samples.
//!
//! Usage:
//!   `cargo run --bin seed_database -- --url http://localhost:3000 --email admin@lab.test --password secret`

use clap::{Arg, Command};
use console::style;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Duration;

const ORIGINS: [&str; 5] = [
    "North Plant",
    "South Plant",
    "Refinery Unit 2",
    "Water Treatment",
    "Smelter Line B",
];
const DESTINATIONS: [&str; 3] = ["Central Lab", "Quality Control", "Research Lab"];
const ROUTES: [&str; 3] = ["Internal Courier", "Truck", "Pneumatic Tube"];
const TEST_METHODS: [&str; 3] = ["ICP-MS", "AAS", "ICP-OES"];
const ANALYSTS: [&str; 4] = ["A. Perera", "K. Silva", "M. Fernando", "R. Jayasinghe"];
const CHEMICALS: [&str; 6] = [
    "Hydrochloric Acid",
    "Sulfuric Acid",
    "Ethanol",
    "Sodium Hydroxide",
    "Ammonia Solution",
    "Acetone",
];
const HAND_OVER_RANGES: [&str; 5] = [
    "Within 1 Week",
    "Within 2 Weeks",
    "Within 3 Weeks",
    "Within 1 Month",
    "Fixed Date",
];
const GRADES: [&str; 5] = ["A", "B", "C", "D", "Other"];

#[derive(Debug, Clone)]
pub struct SeedingConfig {
    pub base_url: String,
    pub jwt_token: String,
    pub client: Client,
}

#[derive(Debug, Default)]
pub struct CreatedObjects {
    pub samples: Vec<Value>,
    pub received: usize,
    pub with_results: usize,
    pub finalized: usize,
    pub chemical_requests: usize,
    pub customer_samples: usize,
}

pub struct DatabaseSeeder {
    config: SeedingConfig,
    sample_count: usize,
    created_objects: CreatedObjects,
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );
    pb
}

fn pick<'a>(options: &[&'a str]) -> &'a str {
    options.choose(&mut rand::rng()).copied().unwrap_or_default()
}

/// A plausible ppb reading with two decimals
fn reading(max: f64) -> String {
    let value: f64 = rand::rng().random_range(0.0..max);
    format!("{value:.2}")
}

impl DatabaseSeeder {
    pub async fn connect(
        base_url: &str,
        email: &str,
        password: &str,
        sample_count: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        println!("{} Logging in...", style("[1/5]").bold().dim());
        let response = client
            .post(format!("{base_url}/api/users/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Login failed with HTTP {status}: {error_text}").into());
        }
        let login: Value = response.json().await?;
        let jwt_token = login["token"]
            .as_str()
            .ok_or("Login response did not contain a token")?
            .to_string();
        println!(
            "{} Logged in as {} ({})",
            style("✅").green(),
            style(login["user"]["name"].as_str().unwrap_or(email)).bold(),
            login["user"]["role"].as_str().unwrap_or("unknown")
        );

        Ok(Self {
            config: SeedingConfig {
                base_url,
                jwt_token,
                client,
            },
            sample_count,
            created_objects: CreatedObjects::default(),
        })
    }

    /// Make multiple requests in parallel with controlled concurrency
    async fn make_parallel_requests(
        &self,
        requests: Vec<(String, Value)>, // (endpoint, data)
        max_concurrent: usize,
        pb: &ProgressBar,
    ) -> Result<Vec<Value>, String> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut tasks = Vec::new();

        for (endpoint, data) in requests {
            let sem = Arc::clone(&semaphore);
            let config = self.config.clone();
            let pb_clone = pb.clone();

            let task = tokio::spawn(async move {
                let _permit = sem.acquire().await.map_err(|e| e.to_string())?;
                let url = format!("{}{}", config.base_url, endpoint);
                let response = config
                    .client
                    .post(&url)
                    .header("authorization", format!("Bearer {}", config.jwt_token))
                    .json(&data)
                    .send()
                    .await;

                let result = match response {
                    Ok(resp) if resp.status().is_success() => resp
                        .json::<Value>()
                        .await
                        .map_err(|e| format!("JSON parse error: {e}")),
                    Ok(resp) => {
                        let status = resp.status();
                        let error_text = resp.text().await.unwrap_or_default();
                        Err(format!("HTTP {status} {endpoint}: {error_text}"))
                    }
                    Err(e) => Err(format!("Request error {endpoint}: {e}")),
                };

                pb_clone.inc(1);
                result
            });

            tasks.push(task);
        }

        join_all(tasks)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Task join error: {e}"))?
            .into_iter()
            .collect()
    }

    async fn make_request(
        &self,
        method: &str,
        endpoint: &str,
        data: &Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        let request = match method.to_uppercase().as_str() {
            "POST" => self.config.client.post(&url),
            "PUT" => self.config.client.put(&url),
            _ => return Err("Unsupported HTTP method".into()),
        };
        let response = request
            .header("authorization", format!("Bearer {}", self.config.jwt_token))
            .json(data)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("HTTP {status} {endpoint}: {error_text}").into())
        }
    }

    pub async fn create_samples(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("{} Creating samples...", style("[2/5]").bold().dim());

        let requests: Vec<(String, Value)> = (1..=self.sample_count)
            .map(|i| {
                let from: Vec<&str> = ORIGINS
                    .choose_multiple(&mut rand::rng(), rand::rng().random_range(1..=2))
                    .copied()
                    .collect();
                let payload = json!({
                    "requestRefNo": format!("REQ-{:04}", i),
                    "sampleRefNo": format!("SR-{:04}", rand::rng().random_range(1000..9999)),
                    "from": from,
                    "to": pick(&DESTINATIONS),
                    "sampleRoute": pick(&ROUTES),
                    "testMethod": pick(&TEST_METHODS),
                    "remarks": "Seeded demo sample",
                    "sampleInDate": "2025-01-15",
                    "sampleInTime": format!("{:02}:{:02}", rand::rng().random_range(7..18), rand::rng().random_range(0..60)),
                    "gatePassNo": format!("GP-{}", rand::rng().random_range(100..999)),
                });
                ("/api/samples".to_string(), payload)
            })
            .collect();

        let pb = progress_bar(requests.len());
        pb.set_message("Creating samples");
        let created = self.make_parallel_requests(requests, 8, &pb).await?;
        pb.finish_with_message("Samples created");

        println!(
            "{} Created {} samples",
            style("✅").green(),
            style(created.len()).bold()
        );
        self.created_objects.samples = created;
        Ok(())
    }

    /// Moves samples through the lifecycle: about three quarters received,
    /// half with results and a quarter finalized.
    pub async fn advance_lifecycle(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("{} Advancing sample lifecycles...", style("[3/5]").bold().dim());

        let ids: Vec<String> = self
            .created_objects
            .samples
            .iter()
            .filter_map(|sample| sample["_id"].as_str().map(str::to_string))
            .collect();
        let pb = progress_bar(ids.len());

        for (index, id) in ids.iter().enumerate() {
            pb.set_message(format!("Sample {}", index + 1));
            let stage = index % 4;

            if stage < 3 {
                self.make_request(
                    "PUT",
                    &format!("/api/samples/samples/{id}/received"),
                    &json!({"received": true}),
                )
                .await?;
                self.created_objects.received += 1;
            }

            if stage < 2 {
                let rows = rand::rng().random_range(1..=4);
                let results: Vec<Value> = (0..rows)
                    .map(|_| {
                        json!({
                            "As_ppb": reading(10.0),
                            "Sb_ppb": reading(5.0),
                            "Al_ppb": reading(150.0),
                        })
                    })
                    .collect();
                self.make_request(
                    "PUT",
                    &format!("/api/samples/{id}"),
                    &json!({
                        "results": results,
                        "analysedBy": pick(&ANALYSTS),
                        "completedDate": "2025-01-20",
                        "completedTime": "15:30",
                    }),
                )
                .await?;
                self.created_objects.with_results += 1;
            }

            if stage == 0 {
                let finalized = self
                    .make_request(
                        "PUT",
                        &format!("/api/samples/{id}"),
                        &json!({"isFinalized": true}),
                    )
                    .await?;
                if let Some(error) = finalized["notification"]["lastError"].as_str() {
                    pb.println(format!(
                        "{} Report email for {} pending: {}",
                        style("⚠️").yellow(),
                        finalized["sampleId"].as_str().unwrap_or(id),
                        error
                    ));
                }
                self.created_objects.finalized += 1;
            }

            pb.inc(1);
        }

        pb.finish_with_message("Lifecycles advanced");
        println!("{} Sample lifecycles advanced", style("✅").green());
        Ok(())
    }

    pub async fn create_chemical_requests(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("{} Creating chemical requests...", style("[4/5]").bold().dim());

        let mut requests: Vec<(String, Value)> = CHEMICALS
            .iter()
            .map(|chemical| {
                (
                    "/api/chemicals/add".to_string(),
                    json!({
                        "chemicalName": chemical,
                        "quantity": format!("{} L", rand::rng().random_range(1..=20)),
                        "handOverRange": pick(&HAND_OVER_RANGES),
                    }),
                )
            })
            .collect();
        requests.push((
            "/api/chemicals/add".to_string(),
            json!({
                "chemicalName": "Other",
                "customChemical": "Nitric Acid 65%",
                "quantity": "2.5 L",
                "handOverRange": "Fixed Date",
            }),
        ));

        let pb = progress_bar(requests.len());
        let created = self.make_parallel_requests(requests, 4, &pb).await?;
        pb.finish_with_message("Chemical requests created");
        self.created_objects.chemical_requests = created.len();

        println!("{} Chemical requests created", style("✅").green());
        Ok(())
    }

    pub async fn create_customer_samples(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        println!("{} Creating customer samples...", style("[5/5]").bold().dim());

        // Reference numbers are unique, so keep them tied to the run time
        let run = chrono::Utc::now().format("%y%m%d%H%M%S");
        let requests: Vec<(String, Value)> = (1..=10)
            .map(|i| {
                (
                    "/api/cusSamples/add".to_string(),
                    json!({
                        "referenceNumber": format!("CUS-{run}-{i:02}"),
                        "quantity": format!("{} kg", rand::rng().random_range(1..=50)),
                        "grade": pick(&GRADES),
                        "date": "2025-01-18",
                        "time": format!("{:02}:00", rand::rng().random_range(8..17)),
                    }),
                )
            })
            .collect();

        let pb = progress_bar(requests.len());
        let created = self.make_parallel_requests(requests, 4, &pb).await?;
        pb.finish_with_message("Customer samples created");
        self.created_objects.customer_samples = created.len();

        println!("{} Customer samples created", style("✅").green());
        Ok(())
    }

    pub async fn seed_database(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.create_samples().await?;
        self.advance_lifecycle().await?;
        self.create_chemical_requests().await?;
        self.create_customer_samples().await?;
        self.display_summary();
        Ok(())
    }

    fn display_summary(&self) {
        println!();
        println!("{}", style("🎉 Database Seeding Complete!").bold().green());
        println!("{}", style("═".repeat(50)).dim());

        let counts = [
            ("Samples", self.created_objects.samples.len()),
            ("  received", self.created_objects.received),
            ("  with results", self.created_objects.with_results),
            ("  finalized", self.created_objects.finalized),
            ("Chemical requests", self.created_objects.chemical_requests),
            ("Customer samples", self.created_objects.customer_samples),
        ];
        for (name, count) in counts {
            println!("  {:<20} {}", style(name).cyan(), style(count).bold().green());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("Sample Tracker Database Seeder")
        .version("1.0")
        .about("Seeds the Sample Tracker API with demo samples, chemical requests and customer samples")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("API base URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .value_name("EMAIL")
                .help("Login email of a lab user")
                .required(true),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Login password")
                .required(true),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .value_name("N")
                .help("Number of samples to create")
                .value_parser(clap::value_parser!(usize))
                .default_value("24"),
        )
        .get_matches();

    let base_url = matches
        .get_one::<String>("url")
        .ok_or("missing --url")?
        .clone();
    let email = matches
        .get_one::<String>("email")
        .ok_or("missing --email")?
        .clone();
    let password = matches
        .get_one::<String>("password")
        .ok_or("missing --password")?
        .clone();
    let count = *matches.get_one::<usize>("count").ok_or("missing --count")?;

    println!("{}", style("Sample Tracker Database Seeder v1.0").bold());
    println!("{}", style("━".repeat(40)).dim());
    println!("API URL: {}", style(&base_url).cyan());
    println!("User:    {}", style(&email).cyan());

    let mut seeder = DatabaseSeeder::connect(&base_url, &email, &password, count).await?;
    seeder.seed_database().await?;

    Ok(())
}
