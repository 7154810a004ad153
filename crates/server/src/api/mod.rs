use shared::{
    domain::{Perfume, PerfumeForm, PerfumeId},
    error::{ApiError, ErrorCode},
};
use storage::Storage;
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_perfumes(ctx: &ApiContext) -> Result<Vec<Perfume>, ApiError> {
    ctx.storage.list_perfumes().await.map_err(internal)
}

pub async fn get_perfume(ctx: &ApiContext, perfume_id: PerfumeId) -> Result<Perfume, ApiError> {
    ctx.storage
        .find_perfume(perfume_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(perfume_id))
}

pub async fn create_perfume(ctx: &ApiContext, form: PerfumeForm) -> Result<PerfumeId, ApiError> {
    let new = form.into_new_perfume()?;
    let perfume_id = ctx.storage.insert_perfume(&new).await.map_err(internal)?;
    info!(perfume_id = perfume_id.0, name = %new.name, brand = %new.brand, "perfume created");
    Ok(perfume_id)
}

/// Assigns every submitted field to an existing row. A missing row wins over
/// an invalid form.
pub async fn update_perfume(
    ctx: &ApiContext,
    perfume_id: PerfumeId,
    form: PerfumeForm,
) -> Result<(), ApiError> {
    get_perfume(ctx, perfume_id).await?;
    let new = form.into_new_perfume()?;
    let updated = ctx
        .storage
        .update_perfume(perfume_id, &new)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(perfume_id));
    }
    info!(perfume_id = perfume_id.0, "perfume updated");
    Ok(())
}

/// Deleting a missing perfume is not an error; the return value says whether
/// a row went away.
pub async fn delete_perfume(ctx: &ApiContext, perfume_id: PerfumeId) -> Result<bool, ApiError> {
    let deleted = ctx
        .storage
        .delete_perfume(perfume_id)
        .await
        .map_err(internal)?;
    if deleted {
        info!(perfume_id = perfume_id.0, "perfume deleted");
    }
    Ok(deleted)
}

fn not_found(perfume_id: PerfumeId) -> ApiError {
    ApiError::not_found(format!("perfume {} not found", perfume_id.0))
}

fn internal(err: anyhow::Error) -> ApiError {
    error!(error = %format!("{err:#}"), "storage failure");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
