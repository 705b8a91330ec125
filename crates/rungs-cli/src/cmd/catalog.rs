//! `rungs catalog`: inspect the effective rule catalog.

use crate::output::{OutputMode, pretty_section, render_mode};
use anyhow::Result;
use clap::{Args, ValueEnum};
use rungs_core::event::EventDefinition;
use rungs_core::model::badge::BadgeDefinition;
use rungs_core::model::boss::BossDefinition;
use rungs_core::model::rank::RankDefinition;
use rungs_core::model::specialization::SpecializationDefinition;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogSection {
    Events,
    Levels,
    Ranks,
    Badges,
    Bosses,
    Specializations,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Which part of the catalog to list.
    #[arg(value_enum, default_value = "events")]
    pub section: CatalogSection,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Listing<'a> {
    Events(&'a [EventDefinition]),
    Levels(&'a [i64]),
    Ranks(&'a [RankDefinition]),
    Badges(&'a [BadgeDefinition]),
    Bosses(&'a [BossDefinition]),
    Specializations(&'a [SpecializationDefinition]),
}

fn write_listing(listing: &Listing<'_>, w: &mut dyn Write) -> io::Result<()> {
    match listing {
        Listing::Events(events) => {
            for event in *events {
                writeln!(
                    w,
                    "{:<22} {:>5} xp  {}",
                    event.key,
                    event.base_xp,
                    event.daily_metric.map_or("-", |metric| metric.as_str())
                )?;
            }
        }
        Listing::Levels(thresholds) => {
            for (index, threshold) in thresholds.iter().enumerate() {
                writeln!(w, "level {:>3}  {threshold:>7} xp", index + 1)?;
            }
        }
        Listing::Ranks(ranks) => {
            for rank in *ranks {
                writeln!(
                    w,
                    "{:<14} {:<5} {:<24} level {}",
                    rank.id, rank.grade, rank.name, rank.requirements.min_level
                )?;
            }
        }
        Listing::Badges(badges) => {
            for badge in *badges {
                let tiers = badge
                    .tiers
                    .iter()
                    .map(|(tier, _)| tier.as_str())
                    .collect::<Vec<_>>()
                    .join("/");
                writeln!(w, "{:<24} {tiers}", badge.id)?;
            }
        }
        Listing::Bosses(bosses) => {
            for boss in *bosses {
                writeln!(
                    w,
                    "{:<14} level {:<3} {:>5} xp  {}",
                    boss.id, boss.unlock_level, boss.rewards.xp, boss.rewards.title
                )?;
            }
        }
        Listing::Specializations(specializations) => {
            for spec in *specializations {
                writeln!(
                    w,
                    "{:<16} level {:<3} {}",
                    spec.id, spec.unlock_level, spec.bonus_label
                )?;
            }
        }
    }
    Ok(())
}

const fn heading(section: CatalogSection) -> &'static str {
    match section {
        CatalogSection::Events => "Event vocabulary",
        CatalogSection::Levels => "Level thresholds",
        CatalogSection::Ranks => "Ranks",
        CatalogSection::Badges => "Badges",
        CatalogSection::Bosses => "Bosses",
        CatalogSection::Specializations => "Specializations",
    }
}

/// Execute `rungs catalog [section]`. Needs no store.
///
/// # Errors
///
/// Returns an error if the configured catalog cannot be loaded.
pub fn run_catalog(args: &CatalogArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let catalog = crate::cmd::load_catalog(project_root)?;
    let listing = match args.section {
        CatalogSection::Events => Listing::Events(catalog.vocabulary().entries()),
        CatalogSection::Levels => Listing::Levels(catalog.levels().thresholds()),
        CatalogSection::Ranks => Listing::Ranks(catalog.ranks()),
        CatalogSection::Badges => Listing::Badges(catalog.badges()),
        CatalogSection::Bosses => Listing::Bosses(catalog.bosses()),
        CatalogSection::Specializations => Listing::Specializations(catalog.specializations()),
    };
    render_mode(output, &listing, write_listing, |l, w| {
        pretty_section(w, heading(args.section))?;
        write_listing(l, w)
    })
}
