use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use realworld_client::models::{Article, LoginCredentials, ProfileUpdate, RegistrationRequest};
use realworld_client::{AuthPhase, ClientConfig, FileStorage, RealWorld};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API base URL, e.g. http://localhost:3000/api
    #[arg(short, long)]
    server: Option<String>,

    /// Where the signed-in user is kept between runs
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    Logout,

    Status,

    /// List articles, optionally keeping only those with any of the given tags
    Articles {
        #[arg(short, long = "tag", conflicts_with = "server_tag")]
        tags: Vec<String>,

        /// Ask the server to filter by a single tag instead
        #[arg(long)]
        server_tag: Option<String>,
    },

    Article {
        slug: String,
    },

    Tags,

    Favorite {
        slug: String,
    },

    Unfavorite {
        slug: String,
    },

    /// Edit the signed-in user's profile
    Profile {
        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        bio: Option<String>,

        #[arg(short, long)]
        image: Option<String>,

        #[arg(short, long)]
        password: Option<String>,
    },
}

fn default_state_file() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".realworld").join("user.json"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match cli.server {
        Some(url) => ClientConfig::from_env().with_base_url(url),
        None => ClientConfig::from_env(),
    };

    let state_file = match cli.state_file {
        Some(path) => path,
        None => default_state_file()?,
    };

    println!("🔌 API: {}", config.base_url.dimmed());

    let app = RealWorld::start(&config, Arc::new(FileStorage::new(&state_file))).await;

    if let Some(reason) = app.auth.state().restore_failure {
        println!(
            "{} Stored session in {:?} could not be read ({}); continuing anonymously",
            "⚠".yellow(),
            state_file,
            reason
        );
    }

    match cli.command {
        Commands::Login { email, password } => {
            println!("🔑 Logging in as: {}", email);

            match app.auth.login(LoginCredentials::new(email, password)).await {
                Ok(user) => {
                    println!("{}", "✅ Login successful!".green());
                    println!("   Username: {}", user.username);
                    println!("   Email: {}", user.email);
                    println!("✓ Session saved to {:?}", state_file);
                }
                Err(e) => fail(format!("Login failed: {}", e)),
            }
        }

        Commands::Register {
            username,
            email,
            password,
        } => {
            println!("📝 Registering user: {}", username);

            let request = RegistrationRequest {
                username,
                email,
                password,
            };
            match app.auth.register(request).await {
                Ok(user) => {
                    println!("{}", "✅ Registration successful!".green());
                    println!("   Username: {}", user.username);
                    println!("   Email: {}", user.email);
                    println!("✓ Session saved to {:?}", state_file);
                }
                Err(e) => fail(format!("Registration failed: {}", e)),
            }
        }

        Commands::Logout => {
            app.auth.logout().await;
            println!("{}", "👋 Signed out".green());
        }

        Commands::Status => match app.auth.state().phase {
            AuthPhase::Authenticated(user) => {
                println!("🔑 Session file: {:?}", state_file);
                println!("   Signed in as: {} <{}>", user.username.bold(), user.email);
                if let Some(bio) = user.bio.filter(|b| !b.is_empty()) {
                    println!("   Bio: {}", bio);
                }
                println!("   Status: ✅ Active");
            }
            _ => {
                println!("❌ Not signed in");
                println!("   Please login first: realworld login --email <email> --password <password>");
            }
        },

        Commands::Articles { tags, server_tag } => {
            let articles = match server_tag {
                Some(tag) => {
                    println!("📋 Listing articles tagged '{}' (server side)", tag);
                    match app.api.list_articles(Some(tag.as_str())).await {
                        Ok(articles) => articles,
                        Err(e) => fail(format!("Failed to list articles: {}", e)),
                    }
                }
                None => {
                    println!("📋 Listing articles");
                    if let Err(e) = app.posts.fetch_posts().await {
                        fail(format!("Failed to list articles: {}", e));
                    }
                    for tag in &tags {
                        app.posts.toggle_tag(tag);
                    }
                    app.posts.posts()
                }
            };

            if !tags.is_empty() {
                println!("   Tags: {}", tags.join(", ").cyan());
            }
            print_article_list(&articles);
        }

        Commands::Article { slug } => {
            println!("🔍 Getting article '{}'", slug);

            match app.posts.load_post(&slug).await {
                Ok(article) => print_article(&article),
                Err(e) => {
                    if e.is_not_found() {
                        fail(format!(
                            "Article '{}' not found\n   Tip: Use 'articles' to see available slugs",
                            slug
                        ));
                    } else {
                        fail(format!("Error: {}", e));
                    }
                }
            }
        }

        Commands::Tags => {
            if let Err(e) = app.posts.fetch_tags().await {
                fail(format!("Failed to load tags: {}", e));
            }

            let tags = app.posts.state().tags;
            if tags.is_empty() {
                println!("   No tags found");
            } else {
                let names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
                println!("🏷  {}", names.join(", ").cyan());
            }
        }

        Commands::Favorite { slug } => set_favorite(&app, &slug, true).await,

        Commands::Unfavorite { slug } => set_favorite(&app, &slug, false).await,

        Commands::Profile {
            username,
            email,
            bio,
            image,
            password,
        } => {
            let update = ProfileUpdate {
                email,
                username,
                password,
                bio,
                image,
            };

            match app.auth.update_profile(update).await {
                Ok(user) => {
                    println!("{}", "✅ Profile updated successfully".green());
                    println!("   Username: {}", user.username);
                    println!("   Email: {}", user.email);
                    if let Some(bio) = &user.bio {
                        println!("   Bio: {}", bio);
                    }
                    if let Some(image) = &user.image {
                        println!("   Image: {}", image);
                    }
                }
                Err(e) => {
                    if e.is_unauthorized() {
                        fail("Unauthorized. Please login first".to_string());
                    } else {
                        fail(format!("Failed to update profile: {}", e));
                    }
                }
            }
        }
    }

    Ok(())
}

async fn set_favorite(app: &RealWorld, slug: &str, favorite: bool) {
    match app.posts.set_favorite(slug, favorite).await {
        Ok(article) => {
            let heart = if article.favorited { "♥".red() } else { "♡".normal() };
            println!("{} {} ({} favorites)", heart, article.title, article.favorites_count);
        }
        Err(e) => {
            if e.is_unauthorized() {
                fail("Unauthorized. Please login first".to_string());
            } else {
                fail(format!("Failed to update favorite status: {}", e));
            }
        }
    }
}

fn fail(message: String) -> ! {
    println!("❌ {}", message);
    std::process::exit(1);
}

fn print_article_list(articles: &[Article]) {
    println!("✅ Found {} articles", articles.len());
    println!();

    if articles.is_empty() {
        println!("   No articles found");
        return;
    }

    for (i, article) in articles.iter().enumerate() {
        let heart = if article.favorited { "♥" } else { "♡" };
        println!("   {}. [{}] {}", i + 1, article.slug, article.title.bold());
        println!(
            "      by {} · {} {} · {}",
            article.author.username,
            heart,
            article.favorites_count,
            article.created_at.format("%Y-%m-%d")
        );
        if !article.tag_list.is_empty() {
            println!("      Tags: {}", article.tag_list.join(", ").cyan());
        }
        println!("      {}", truncate(&article.description, 60));
        println!();
    }
}

fn print_article(article: &Article) {
    println!("✅ Article retrieved:");
    println!("   Slug: {}", article.slug);
    println!("   Title: {}", article.title.bold());
    println!("   Author: {}", article.author.username);
    println!("   Favorites: {}{}", article.favorites_count, if article.favorited { " (yours)" } else { "" });
    println!("   Tags: {}", article.tag_list.join(", "));
    println!("   Created: {}", article.created_at.format("%Y-%m-%d %H:%M"));
    println!("   Updated: {}", article.updated_at.format("%Y-%m-%d %H:%M"));
    println!();
    println!("{}", article.body);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}
