use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use laqp_site::catalog::{self, CatalogSet, Collection};
use laqp_site::comment_feed::spawn_provider;
use laqp_site::comment_service::{CommentService, HttpCommentService};
use laqp_site::comments::{
    Delta, WidgetCommand, WidgetState, apply_delta, page_key, validate_draft,
};
use laqp_site::demo_service::DemoCommentService;
use laqp_site::render;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let base =
        std::env::var("LAQP_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let out_dir = PathBuf::from(
        std::env::var("LAQP_OUT_DIR").unwrap_or_else(|_| "site_out".to_string()),
    );

    let catalogs = load_catalogs(&base);
    report_validation(&catalogs);
    build_site_pages(&base, &out_dir, &catalogs)?;

    run_comment_console()
}

fn load_catalogs(base: &str) -> CatalogSet {
    match CatalogSet::load(
        base,
        &[Collection::Leagues, Collection::Teams, Collection::Players],
    ) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("[WARN] No se pudieron cargar los catálogos: {err:#}");
            CatalogSet::empty()
        }
    }
}

fn report_validation(catalogs: &CatalogSet) {
    let (Some(leagues), Some(teams), Some(players)) =
        (&catalogs.leagues, &catalogs.teams, &catalogs.players)
    else {
        return;
    };
    let issues = catalog::validate(leagues.items(), teams.items(), players.items());
    if issues.is_empty() {
        println!(
            "Validación OK ({} ligas, {} equipos, {} jugadores)",
            leagues.len(),
            teams.len(),
            players.len()
        );
    } else {
        for issue in issues {
            println!("[WARN] {issue}");
        }
    }
}

fn build_site_pages(base: &str, out_dir: &Path, catalogs: &CatalogSet) -> Result<()> {
    let entries = match catalog::fetch_pages(base) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!(
                "[WARN] Índice de páginas no disponible, se usan tarjetas de demostración: {err:#}"
            );
            render::placeholder_entries()
        }
    };

    let sections = render::split_featured(&entries);
    let index_html = render::render_page(
        render::DEFAULT_TEMPLATE,
        &render::render_featured(&sections.featured),
        &render::render_sections(&sections.categories),
    );
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    fs::write(out_dir.join("index.html"), index_html).context("writing index.html")?;

    if let Some(players) = &catalogs.players {
        let cards: Vec<String> = players
            .items()
            .iter()
            .map(|p| render::player_card(p, catalogs.teams.as_ref(), catalogs.leagues.as_ref()))
            .collect();
        let body = format!(
            "<section class=\"page-section\">\n<h2>Jugadores</h2>\n<div class=\"card-grid\">\n{}\n</div>\n</section>",
            cards.join("\n")
        );
        let players_html = render::render_page(render::DEFAULT_TEMPLATE, "", &body);
        fs::write(out_dir.join("jugadores.html"), players_html)
            .context("writing jugadores.html")?;
    }

    println!("Páginas generadas en {}", out_dir.display());
    Ok(())
}

fn run_comment_console() -> Result<()> {
    let key = std::env::var("LAQP_PAGE_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| page_key("/index.html"));

    let source = std::env::var("LAQP_COMMENTS_SOURCE")
        .unwrap_or_else(|_| "demo".to_string())
        .to_lowercase();
    let service: Box<dyn CommentService> = match source.as_str() {
        "http" => {
            let url = std::env::var("LAQP_COMMENTS_URL")
                .context("LAQP_COMMENTS_URL es obligatorio con LAQP_COMMENTS_SOURCE=http")?;
            Box::new(HttpCommentService::new(
                url,
                std::env::var("LAQP_COMMENTS_TOKEN").ok(),
            ))
        }
        _ => Box::new(DemoCommentService::seeded(&key)),
    };

    let poll = Duration::from_secs(
        std::env::var("COMMENTS_POLL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(5)
            .max(2),
    );

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let subscription = spawn_provider(service, key.clone(), poll, tx, cmd_rx);
    let mut state = WidgetState::new(key);

    println!();
    println!("Comentarios de la página '{}'", state.page_key);
    println!("Comandos: login | logout | post <texto> | delete <id> | refresh | salir");

    let stdin = io::stdin();
    loop {
        thread::sleep(Duration::from_millis(300));
        drain_deltas(&rx, &mut state);
        print_widget(&mut state);

        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => {}
            "salir" | "quit" | "q" => break,
            "login" => send_cmd(&cmd_tx, WidgetCommand::SignIn, &mut state),
            "logout" => send_cmd(&cmd_tx, WidgetCommand::SignOut, &mut state),
            "refresh" => {
                let key = state.page_key.clone();
                send_cmd(
                    &cmd_tx,
                    WidgetCommand::Resubscribe { page_key: key },
                    &mut state,
                );
            }
            _ if line.starts_with("post ") => {
                state.draft = line["post ".len()..].to_string();
                if state.current_user().is_none() {
                    println!("Inicia sesión primero (login).");
                } else {
                    match validate_draft(&state.draft) {
                        Ok(trimmed) => {
                            let text = trimmed.to_string();
                            state.posting = true;
                            send_cmd(&cmd_tx, WidgetCommand::Post { text }, &mut state);
                        }
                        Err(_) => println!("El comentario debe tener entre 1 y 1000 caracteres."),
                    }
                }
            }
            _ if line.starts_with("delete ") => {
                let id = line["delete ".len()..].trim().to_string();
                let viewer = state.current_user().map(|u| u.id.clone());
                let owner = state
                    .comments
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.user_id.clone());
                match (viewer, owner) {
                    (None, _) => println!("Inicia sesión primero (login)."),
                    (_, None) => println!("No existe ese comentario."),
                    (Some(viewer), Some(owner)) if viewer != owner => {
                        println!("Solo puedes borrar tus propios comentarios.");
                    }
                    _ => {
                        print!("¿Confirmar borrado? (s/N): ");
                        io::stdout().flush()?;
                        let mut answer = String::new();
                        stdin.read_line(&mut answer)?;
                        if answer.trim().eq_ignore_ascii_case("s") {
                            state.deleting = Some(id.clone());
                            send_cmd(&cmd_tx, WidgetCommand::Delete { id }, &mut state);
                        } else {
                            println!("(Cancelado)");
                        }
                    }
                }
            }
            _ => println!("Comando desconocido."),
        }
    }

    subscription.close();
    Ok(())
}

fn send_cmd(cmd_tx: &mpsc::Sender<WidgetCommand>, cmd: WidgetCommand, state: &mut WidgetState) {
    if cmd_tx.send(cmd).is_err() {
        state.push_log("[WARN] El proveedor de comentarios no responde");
    }
}

fn drain_deltas(rx: &mpsc::Receiver<Delta>, state: &mut WidgetState) {
    while let Ok(delta) = rx.try_recv() {
        if let Delta::Log(line) = &delta {
            println!("{line}");
        }
        apply_delta(state, delta);
    }
}

fn print_widget(state: &mut WidgetState) {
    if let Some(alert) = state.alert.take() {
        println!("[AVISO] {alert}");
    }
    match state.current_user() {
        Some(user) => println!("Conectado como {}", user.name),
        None => println!("Sin sesión"),
    }
    if state.list_error.is_some() {
        println!("  (no se pudieron cargar los comentarios)");
        return;
    }
    if state.comments.is_empty() {
        println!("  Sé el primero en comentar.");
        return;
    }
    for comment in &state.comments {
        println!(
            "  [{}] {} — {} — {}",
            comment.id,
            comment.user_name,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.text
        );
    }
}
