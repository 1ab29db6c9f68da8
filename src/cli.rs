use crate::browse::{Destination, Navigator, Page, PageView};
use crate::catalog::ImageUrls;
use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::model::{Movie, SignupData};
use crate::player::Player;
use crate::render;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::transcript::Transcript;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

pub struct Context<S: KeyValueStore> {
    pub config: Config,
    pub session_id: String,
    pub state_dir: PathBuf,
    pub debug: bool,
    pub transcript: RefCell<Transcript>,
    pub session: RefCell<SessionStore<S>>,
    pub favorites: RefCell<FavoritesStore<S>>,
    pub navigator: RefCell<Navigator>,
    pub player: Player,
    pub images: ImageUrls,
    /// Movies from the last page shown, used to resolve ids
    pub visible: RefCell<Vec<Movie>>,
}

/// Commands usable before signing in
const SIGNED_OUT_COMMANDS: [&str; 6] = ["/help", "/exit", "/quit", "/login", "/signup", "/session"];

pub fn run_once<S: KeyValueStore>(ctx: &Context<S>, line: &str) -> Result<()> {
    report_recovered_state(ctx);
    dispatch(ctx, line.trim());
    // A one-shot page command has nothing to come back to; finish the load
    if ctx.navigator.borrow().pending().is_some() {
        let view = ctx
            .navigator
            .borrow_mut()
            .wait(Duration::from_millis(ctx.config.catalog.timeout_ms));
        if let Some(view) = view {
            show_page(ctx, view);
        }
    }
    Ok(())
}

pub fn run_repl<S: KeyValueStore>(ctx: Context<S>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("flix - type /help for commands, /exit to quit");
    report_recovered_state(&ctx);

    let greeting = ctx
        .session
        .borrow()
        .user()
        .map(|u| u.name.clone().unwrap_or_else(|| u.username.clone()));
    match greeting {
        Some(name) => {
            println!("Welcome back, {}", name);
            go(&ctx, Destination::Page(Page::Home));
        }
        None => println!("Sign in with /login <username> <password> or /signup <name> <email> <password> <confirm>"),
    }

    loop {
        show_arrived(&ctx);

        match rl.readline(">>> ") {
            Ok(line) => {
                // A page may have landed while the prompt was waiting
                show_arrived(&ctx);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if dispatch(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Show a page whose load finished in the background. Returns true if one did.
fn show_arrived<S: KeyValueStore>(ctx: &Context<S>) -> bool {
    let arrived = ctx.navigator.borrow_mut().poll();
    match arrived {
        Some(view) => {
            show_page(ctx, view);
            true
        }
        None => false,
    }
}

/// Run one line of input. Returns true when the shell should exit.
pub fn dispatch<S: KeyValueStore>(ctx: &Context<S>, line: &str) -> bool {
    if line.starts_with('/') {
        return handle_command(ctx, line);
    }
    // Bare text is a search, like typing into the header search box
    if require_user(ctx) {
        go(ctx, Destination::Search(line.to_string()));
    }
    false
}

fn require_user<S: KeyValueStore>(ctx: &Context<S>) -> bool {
    if ctx.session.borrow().is_signed_in() {
        true
    } else {
        println!("Not signed in. Use /login or /signup first.");
        false
    }
}

fn report_recovered_state<S: KeyValueStore>(ctx: &Context<S>) {
    let describe = |e: &crate::storage::StorageError| (e.is_corrupt(), e.to_string());
    let errors = [
        ("session", ctx.session.borrow().recovered_from().map(describe)),
        ("favorites", ctx.favorites.borrow().recovered_from().map(describe)),
    ];
    for (store, error) in errors {
        let Some((corrupt, error)) = error else {
            continue;
        };
        if corrupt {
            eprintln!("Warning: {}; {} has been reset", error, store);
        } else {
            eprintln!("Warning: could not read saved {}: {}", store, error);
        }
        let _ = ctx.transcript.borrow_mut().restore_error(store, &error);
    }
}

fn handle_command<S: KeyValueStore>(ctx: &Context<S>, cmd: &str) -> bool {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    let name = parts[0];
    let rest = if parts.len() > 1 { parts[1].trim() } else { "" };

    if !SIGNED_OUT_COMMANDS.contains(&name) && !require_user(ctx) {
        return false;
    }

    match name {
        "/exit" | "/quit" => return true,
        "/help" => {
            println!("Commands:");
            println!("  /exit                 - quit");
            println!("  /help                 - show commands");
            println!("  /session              - show session info");
            println!("Account:");
            println!("  /login <user> <pass>  - sign in");
            println!("  /signup <name> <email> <password> <confirm> [avatar]");
            println!("  /logout               - sign out");
            println!("  /whoami               - show the signed-in user");
            println!("  /avatar <uri>         - change your avatar");
            println!("Browse:");
            println!("  /pages                - list pages");
            println!("  /page <name>          - open a page (home, movies, series, ...)");
            println!("  /search <query>       - search the catalog (or just type)");
            println!("  /genres               - list genres");
            println!("  /movie <id>           - show movie details");
            println!("Favourites:");
            println!("  /favs                 - show favourites");
            println!("  /fav <id>             - toggle a favourite");
            println!("  /unfav <id>           - remove a favourite");
            println!("Player:");
            println!("  /play <id>            - play a preview");
        }
        "/session" => {
            println!("Session: {}", ctx.session_id);
            println!("Transcript: {:?}", ctx.transcript.borrow().path);
            println!("State: {:?}", ctx.state_dir);
            if let Some(pending) = ctx.navigator.borrow().pending() {
                println!("Loading: {}", pending);
            }
        }
        "/login" => handle_login(ctx, rest),
        "/signup" => handle_signup(ctx, rest),
        "/logout" => {
            ctx.navigator.borrow_mut().cancel();
            let username = ctx
                .session
                .borrow()
                .user()
                .map(|u| u.username.clone())
                .unwrap_or_default();
            match ctx.session.borrow_mut().logout() {
                Ok(()) => {
                    println!("Signed out");
                    let _ = ctx.transcript.borrow_mut().logout(&username);
                }
                Err(e) => eprintln!("Failed to sign out: {}", e),
            }
        }
        "/whoami" => {
            if let Some(user) = ctx.session.borrow().user() {
                println!("{}", render::user(user));
            }
        }
        "/avatar" => {
            if rest.is_empty() {
                println!("Usage: /avatar <uri>");
            } else {
                match ctx.session.borrow_mut().update_avatar(rest) {
                    Ok(()) => {
                        println!("Avatar updated");
                        let _ = ctx.transcript.borrow_mut().avatar_update(rest);
                    }
                    Err(e) => eprintln!("Failed to update avatar: {}", e),
                }
            }
        }
        "/pages" => {
            println!("Pages:");
            for page in Page::ALL {
                println!("  {}", page.as_str());
            }
        }
        "/page" => match rest.parse::<Page>() {
            Ok(Page::Favorites) => show_favorites(ctx),
            Ok(page) => go(ctx, Destination::Page(page)),
            Err(e) => println!("{}. Use /pages to list.", e),
        },
        "/favs" => show_favorites(ctx),
        "/search" => go(ctx, Destination::Search(rest.to_string())),
        "/genres" => {
            let genres = match ctx.navigator.borrow().catalog().genres() {
                Ok(genres) => genres,
                Err(e) => {
                    log_fetch_error(ctx, "genres", &e.to_string());
                    Vec::new()
                }
            };
            println!("Genres ({}):", genres.len());
            if !genres.is_empty() {
                println!("{}", render::genres(&genres));
            }
        }
        "/movie" => {
            if let Some(id) = parse_id(rest) {
                let details = ctx.navigator.borrow().catalog().details(id);
                match details {
                    Ok(details) => {
                        println!("{}", render::details(&details, &ctx.images));
                        if ctx.favorites.borrow().contains(id) {
                            println!("♥ In your favourites");
                        }
                    }
                    Err(e) => log_fetch_error(ctx, &format!("movie {}", id), &e.to_string()),
                }
            }
        }
        "/fav" => {
            if let Some(movie) = parse_id(rest).and_then(|id| resolve_movie(ctx, id)) {
                let (id, title) = (movie.id, movie.title.clone());
                let toggled = ctx.favorites.borrow_mut().toggle(movie);
                match toggled {
                    Ok(added) => {
                        if added {
                            println!("♥ Added \"{}\" to favourites", title);
                        } else {
                            println!("Removed \"{}\" from favourites", title);
                        }
                        let _ = ctx.transcript.borrow_mut().favorite(id, added);
                    }
                    Err(e) => eprintln!("Failed to save favourites: {}", e),
                }
            }
        }
        "/unfav" => {
            if let Some(id) = parse_id(rest) {
                if !ctx.favorites.borrow().contains(id) {
                    println!("{} is not in your favourites", id);
                } else {
                    let removed = ctx.favorites.borrow_mut().remove(id);
                    match removed {
                        Ok(()) => {
                            println!("Removed {} from favourites", id);
                            let _ = ctx.transcript.borrow_mut().favorite(id, false);
                        }
                        Err(e) => eprintln!("Failed to save favourites: {}", e),
                    }
                }
            }
        }
        "/play" => {
            if let Some(movie) = parse_id(rest).and_then(|id| resolve_movie(ctx, id)) {
                match ctx.player.play(&movie) {
                    Ok(playback) => {
                        println!("{}", render::playback(&playback));
                        let _ = ctx
                            .transcript
                            .borrow_mut()
                            .play(movie.id, &playback.video_url);
                    }
                    Err(e) => eprintln!("Cannot play: {}", e),
                }
            }
        }
        _ => println!("Unknown command: {}", name),
    }
    false
}

fn handle_login<S: KeyValueStore>(ctx: &Context<S>, args: &str) {
    let words = match shell_words::split(args) {
        Ok(words) => words,
        Err(e) => {
            println!("Invalid arguments: {}", e);
            return;
        }
    };
    let username = words.first().map(String::as_str).unwrap_or("");
    let password = words.get(1).map(String::as_str).unwrap_or("");

    println!("Signing in...");
    let result = ctx.session.borrow_mut().login(username, password);
    match result {
        Ok(true) => {
            println!("Signed in as {}", username);
            let _ = ctx.transcript.borrow_mut().login(username, true);
            go(ctx, Destination::Page(Page::Home));
        }
        Ok(false) => {
            println!("Username and password are required");
            let _ = ctx.transcript.borrow_mut().login(username, false);
        }
        Err(e) => eprintln!("Failed to save session: {}", e),
    }
}

fn handle_signup<S: KeyValueStore>(ctx: &Context<S>, args: &str) {
    let words = match shell_words::split(args) {
        Ok(words) => words,
        Err(e) => {
            println!("Invalid arguments: {}", e);
            return;
        }
    };
    let field = |i: usize| words.get(i).cloned().unwrap_or_default();
    let data = SignupData {
        name: field(0),
        email: field(1),
        password: field(2),
        confirm_password: field(3),
    };
    let avatar = words.get(4).cloned();

    println!("Creating account...");
    let result = ctx.session.borrow_mut().signup(&data);
    match result {
        Ok(true) => {
            let username = ctx
                .session
                .borrow()
                .user()
                .map(|u| u.username.clone())
                .unwrap_or_default();
            println!("Welcome, {} (username: {})", data.name, username);
            let _ = ctx.transcript.borrow_mut().signup(Some(&username), &[]);
            if let Some(avatar) = &avatar {
                match ctx.session.borrow_mut().update_avatar(avatar) {
                    Ok(()) => {
                        let _ = ctx.transcript.borrow_mut().avatar_update(avatar);
                    }
                    Err(e) => eprintln!("Failed to update avatar: {}", e),
                }
            }
            go(ctx, Destination::Page(Page::Home));
        }
        Ok(false) => {
            let errors: Vec<String> = ctx
                .session
                .borrow()
                .signup_errors()
                .iter()
                .map(|e| e.to_string())
                .collect();
            println!("Could not sign up:");
            for error in &errors {
                println!("  {}", error);
            }
            let _ = ctx.transcript.borrow_mut().signup(None, &errors);
        }
        Err(e) => eprintln!("Failed to save session: {}", e),
    }
}

/// Start a navigation and show it if it arrives within the wait budget
fn go<S: KeyValueStore>(ctx: &Context<S>, destination: Destination) {
    let generation = ctx.navigator.borrow_mut().navigate(destination.clone());
    let _ = ctx
        .transcript
        .borrow_mut()
        .navigate(&destination.to_string(), generation);
    if ctx.debug {
        eprintln!("[DEBUG] navigate {} (generation {})", destination, generation);
    }

    let wait = Duration::from_millis(ctx.config.browse.wait_ms);
    let view = ctx.navigator.borrow_mut().wait(wait);
    match view {
        Some(view) => show_page(ctx, view),
        None => println!("Still loading {}; press Enter to show it", destination),
    }
}

fn show_page<S: KeyValueStore>(ctx: &Context<S>, view: PageView) {
    let destination = view.destination.to_string();
    for error in &view.errors {
        log_fetch_error(ctx, &destination, error);
    }

    if view.is_empty() {
        if let Destination::Search(query) = &view.destination {
            if query.trim().is_empty() {
                println!("Search cleared");
            } else {
                println!("No results for \"{}\"", query);
            }
        }
    }

    let favorites = ctx.favorites.borrow();
    if !(view.is_empty() && matches!(view.destination, Destination::Search(_))) {
        println!("{}", render::page(&view, |id| favorites.contains(id)));
    }

    let movies: Vec<Movie> = view.movies().cloned().collect();
    let _ = ctx
        .transcript
        .borrow_mut()
        .page_loaded(&destination, movies.len());
    *ctx.visible.borrow_mut() = movies;
}

fn show_favorites<S: KeyValueStore>(ctx: &Context<S>) {
    // Leaving for a local page still supersedes any load in flight
    ctx.navigator.borrow_mut().cancel();

    let view = PageView::favorites(ctx.favorites.borrow().list());
    if view.is_empty() {
        println!("No favourites yet. Use /fav <id> on any movie to add it.");
        ctx.visible.borrow_mut().clear();
        return;
    }
    show_page(ctx, view);
}

fn log_fetch_error<S: KeyValueStore>(ctx: &Context<S>, context: &str, error: &str) {
    eprintln!("Warning: could not load {}: {}", context, error);
    let _ = ctx.transcript.borrow_mut().fetch_error(context, error);
}

fn parse_id(arg: &str) -> Option<u64> {
    match arg.parse::<u64>() {
        Ok(id) => Some(id),
        Err(_) => {
            println!("Expected a movie id, got '{}'", arg);
            None
        }
    }
}

/// Find a movie by id: last shown page, then favourites, then the catalog
fn resolve_movie<S: KeyValueStore>(ctx: &Context<S>, id: u64) -> Option<Movie> {
    if let Some(movie) = ctx.visible.borrow().iter().find(|m| m.id == id) {
        return Some(movie.clone());
    }
    if let Some(movie) = ctx.favorites.borrow().list().iter().find(|m| m.id == id) {
        return Some(movie.clone());
    }

    let details = ctx.navigator.borrow().catalog().details(id);
    match details {
        Ok(details) => Some(details.movie),
        Err(e) => {
            log_fetch_error(ctx, &format!("movie {}", id), &e.to_string());
            None
        }
    }
}
