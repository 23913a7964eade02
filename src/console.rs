//! Line based console transport used by `radiomenu start`.
//!
//! Each stdin line is one [`ConsoleCommand`]. The console plays the part of a game server:
//! it registers users in a [`StaticDirectory`], forwards `menuselect` input and prints the
//! frames the registry renders.
//!
//! ```text
//! connect 5 de        # user 5 joins, German client
//! 5 menuselect 1      # user 5 presses 1
//! show 5              # print user 5's queue
//! ```

use std::str::FromStr;

use anyhow::anyhow;
use thiserror::Error;

use crate::popup::menu::response_fn;
use crate::popup::{
    LanguageGroupId, Menu, MenuHandle, MenuId, PopupResult, SendArgs, SendResult, SessionRegistry,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect {
        user: UserId,
        language: Option<String>,
        automated: bool,
    },
    Disconnect(UserId),
    Reset,
    /// Raw client command from a user, e.g. `menuselect 3`.
    Input { user: UserId, args: Vec<String> },
    Show(UserId),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleParseError {
    #[error("empty line")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' is not a user id")]
    BadUser(String),
    #[error("missing {0}")]
    Missing(&'static str),
}

pub const HELP: &str = "\
commands:
  connect <id> [lang] [bot]   user joins (bot: automated client)
  disconnect <id>             user leaves
  reset                       world reset, every queue emptied
  <id> menuselect <n>         user presses key n
  show <id>                   print queue and history of a user
  help | quit";

fn parse_user(token: Option<&str>) -> Result<UserId, ConsoleParseError> {
    let token = token.ok_or(ConsoleParseError::Missing("user id"))?;
    token
        .parse()
        .map_err(|_| ConsoleParseError::BadUser(token.to_string()))
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or(ConsoleParseError::Empty)?;
        match head.to_ascii_lowercase().as_str() {
            "connect" => {
                let user = parse_user(parts.next())?;
                let mut language = None;
                let mut automated = false;
                for token in parts {
                    if token.eq_ignore_ascii_case("bot") {
                        automated = true;
                    } else {
                        language = Some(token.to_ascii_lowercase());
                    }
                }
                Ok(ConsoleCommand::Connect {
                    user,
                    language,
                    automated,
                })
            }
            "disconnect" => Ok(ConsoleCommand::Disconnect(parse_user(parts.next())?)),
            "reset" => Ok(ConsoleCommand::Reset),
            "show" => Ok(ConsoleCommand::Show(parse_user(parts.next())?)),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => {
                let user: UserId = other
                    .parse()
                    .map_err(|_| ConsoleParseError::Unknown(other.to_string()))?;
                let args: Vec<String> = parts.map(str::to_string).collect();
                if args.is_empty() {
                    return Err(ConsoleParseError::Missing("client command"));
                }
                Ok(ConsoleCommand::Input { user, args })
            }
        }
    }
}

/// Handles to the demo menu tree loaded by the console.
#[derive(Debug, Clone, Copy)]
pub struct Demo {
    pub main: MenuId,
    pub maps: MenuId,
    pub greeting: MenuId,
    pub inventory: MenuId,
    pub shop: LanguageGroupId,
    pub votes: [MenuHandle; 2],
}

/// Register a small menu tree exercising every menu kind.
pub fn install_demo(registry: &mut SessionRegistry) -> PopupResult<Demo> {
    let mut maps = Menu::list("Map history");
    for map in [
        "de_dust", "de_aztec", "cs_office", "de_nuke", "de_train", "cs_italy", "de_inferno",
        "de_cbble", "cs_assault", "de_prodigy", "de_survivor", "cs_militia",
    ] {
        maps.push_line(map);
    }
    let maps = registry.create_menu(maps);

    let greeting = registry.create_menu(
        Menu::template().with_lines(["Welcome, $name!", "Press any key to continue."]),
    );

    let inventory = registry.create_menu(
        Menu::built_paged("Inventory", |ctx, content| {
            content.title = Some(format!("Inventory of player {}", ctx.user));
            for slot in 0..(ctx.user % 5 + 2) {
                content.add(slot, format!("Item #{}", slot + 1), slot % 3 != 2);
            }
            content
                .response_args
                .insert("owner".into(), ctx.user.into());
            Ok(())
        })
        .with_callback(|_, params| {
            log::info!(
                "player {} used inventory slot {}",
                params.user,
                params.choice
            );
            Ok(SendResult::Advance)
        }),
    );

    let shop = registry.create_language_group();
    registry.configure_language_group(shop, |defaults| {
        defaults.response_args.insert("shop".into(), "armory".into());
        defaults.callback = Some(response_fn(|_, params| {
            log::info!("player {} bought {}", params.user, params.choice);
            Ok(SendResult::Advance)
        }));
    })?;
    let mut shop_en = Menu::paged("Armory");
    shop_en.add("kevlar", "Kevlar (650)", true);
    shop_en.add("helmet", "Kevlar + Helmet (1000)", true);
    shop_en.add("defuse", "Defuse kit (200)", false);
    let shop_en = registry.create_menu(shop_en);
    registry.set_language_variant(shop, "en", shop_en)?;
    let mut shop_de = Menu::paged("Waffenkammer");
    shop_de.add("kevlar", "Kevlar (650)", true);
    shop_de.add("helmet", "Kevlar + Helm (1000)", true);
    shop_de.add("defuse", "Entschärfer (200)", false);
    let shop_de = registry.create_menu(shop_de);
    registry.set_language_variant(shop, "de", shop_de)?;

    let vote_group = registry.create_menu_group();
    let next_map = registry.create_menu(
        Menu::plain().with_lines(["Vote: change map now?", "1. Yes", "2. No"]),
    );
    let extend = registry.create_menu(
        Menu::plain().with_lines(["Vote: extend current map?", "1. Yes", "2. No"]),
    );
    let votes = [
        registry.add_to_group(vote_group, next_map.into())?,
        registry.add_to_group(vote_group, extend.into())?,
    ];

    let mut main = Menu::paged("Main menu");
    main.add("maps", "Map history", true);
    main.add("greet", "Greeting", true);
    main.add("shop", "Armory", true);
    main.add("inventory", "Inventory", true);
    main.add("vote", "Start a vote", true);
    main.add("admin", "Admin (locked)", false);
    let main = registry.create_menu(main.with_callback(move |reg, params| {
        match params.choice.as_str() {
            Some("maps") => Ok(SendResult::ReplaceWith(maps.into())),
            Some("greet") => {
                let name = format!("player{}", params.user);
                reg.send(params.user, greeting.into(), SendArgs::default().with("name", name))?;
                Ok(SendResult::Advance)
            }
            Some("shop") => Ok(SendResult::ReplaceWith(shop.into())),
            Some("inventory") => Ok(SendResult::ReplaceWith(inventory.into())),
            Some("vote") => {
                reg.send(params.user, votes[0], SendArgs::default())?;
                Ok(SendResult::Chain(votes[1]))
            }
            other => Err(anyhow!("main menu has no action for {:?}", other)),
        }
    }));

    Ok(Demo {
        main,
        maps,
        greeting,
        inventory,
        shop,
        votes,
    })
}
