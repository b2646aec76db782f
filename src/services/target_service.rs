//! services/target_service.rs
//! Listas de destinos: un destino por línea, primer campo CSV.
//! Los archivos viven sólo en `{data_dir}/targets`; las exportaciones de
//! miembros se escriben ahí mismo y luego sirven como `target_file`.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::models::campaign_model::TargetIdentity;
use crate::models::platform_model::{CampaignError, CampaignResult, EntityHandle};

/// Líneas vacías o sin identificador se ignoran. El orden se conserva.
pub fn parse_targets(text: &str) -> Vec<TargetIdentity> {
    text.lines()
        .filter_map(|line| line.split(',').next())
        .filter_map(TargetIdentity::parse)
        .collect()
}

/// Un nombre de archivo simple: sin separadores, sin componentes ocultos ni `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// "https://t.me/grupo" o "@grupo" -> "grupo"; el resto de caracteres raros -> '_'
fn clean_group_name(group: &str) -> String {
    let trimmed = group
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("t.me/")
        .trim_start_matches('@');
    let cleaned: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "group".to_string()
    } else {
        cleaned
    }
}

fn member_line(member: &EntityHandle) -> String {
    format!(
        "{},{},{},{}",
        member.id,
        member.username.as_deref().unwrap_or(""),
        member.first_name.as_deref().unwrap_or(""),
        member.last_name.as_deref().unwrap_or("")
    )
}

#[derive(Clone, Debug)]
pub struct TargetStore {
    dir: PathBuf,
}

impl TargetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TargetStore { dir: dir.into() }
    }

    /// Ruta real de `name` dentro del directorio de destinos.
    /// Rechaza cualquier nombre que pueda salir de él, incluso vía symlink.
    pub async fn resolve(&self, name: &str) -> CampaignResult<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(CampaignError::InvalidInput(format!(
                "Nombre de archivo de destinos inválido: '{}'",
                name
            )));
        }

        let not_found = || {
            CampaignError::InvalidInput(format!("Archivo de destinos no encontrado: '{}'", name))
        };
        let root = tokio::fs::canonicalize(&self.dir)
            .await
            .map_err(|_| not_found())?;
        let path = tokio::fs::canonicalize(self.dir.join(name))
            .await
            .map_err(|_| not_found())?;

        if !path.starts_with(&root) || !path.is_file() {
            log::warn!("(TargetStore::resolve) Ruta fuera de {}: {}", root.display(), name);
            return Err(not_found());
        }
        Ok(path)
    }

    pub async fn load(&self, name: &str) -> CampaignResult<Vec<TargetIdentity>> {
        let path = self.resolve(name).await?;
        Ok(read_targets(&path).await?)
    }

    /// Escribe `id,username,nombre,apellido` por miembro y devuelve el nombre del archivo.
    pub async fn save_members(&self, group: &str, members: &[EntityHandle]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("No se pudo crear {}", self.dir.display()))?;

        let file_name = format!(
            "members_{}_{}.txt",
            clean_group_name(group),
            Utc::now().format("%Y%m%d")
        );
        let path = self.dir.join(&file_name);
        let lines: Vec<String> = members.iter().map(member_line).collect();

        tokio::fs::write(&path, lines.join("\n"))
            .await
            .with_context(|| format!("No se pudo escribir {}", path.display()))?;

        log::info!(
            "(save_members) {} miembros guardados en {}",
            members.len(),
            path.display()
        );
        Ok(file_name)
    }
}

async fn read_targets(path: &Path) -> Result<Vec<TargetIdentity>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("No se pudo leer el archivo de destinos {}", path.display()))?;
    let targets = parse_targets(&text);
    log::info!(
        "(read_targets) {} destinos leídos de {}",
        targets.len(),
        path.display()
    );
    Ok(targets)
}
