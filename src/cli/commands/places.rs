//! Places commands - list, show, create, edit, delete

use super::{format_time, print_json, truncate};
use crate::api::{Place, PlaceDetail};
use crate::cli::args::{CreatePlaceArgs, EditPlaceArgs, OutputFormat, PlacesAction, PlacesArgs};
use crate::dashboard::{Dashboard, PlaceEdit};
use crate::error::{PlaceboardError, PlaceboardResult};
use crate::forms::{wilaya_name, CreatePlaceForm, PlaceFields};
use crate::ui::{self, TaskSpinner, UiContext, UploadProgress};
use crate::upload::UploadFile;
use console::style;
use std::path::PathBuf;

pub async fn execute(args: PlacesArgs, dashboard: &mut Dashboard) -> PlaceboardResult<()> {
    match args.action {
        PlacesAction::List(output) => list(dashboard, output.format).await,
        PlacesAction::Show { id, output } => show(dashboard, &id, output.format).await,
        PlacesAction::Create(args) => create(dashboard, args).await,
        PlacesAction::Edit(args) => edit(dashboard, args).await,
        PlacesAction::Delete { id, yes } => delete(dashboard, &id, yes).await,
    }
}

fn wilaya_label(code: u8) -> String {
    match wilaya_name(code) {
        Some(name) => format!("{:02} {}", code, name),
        None => format!("{:02}", code),
    }
}

async fn list(dashboard: &Dashboard, format: OutputFormat) -> PlaceboardResult<()> {
    let places = dashboard.places().await?;

    if places.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No places yet"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&places),
        OutputFormat::Json => print_json(&places)?,
        OutputFormat::Plain => {
            for place in &places {
                println!("{}", place.id);
            }
        }
    }
    Ok(())
}

fn print_table(places: &[Place]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Places");

    println!(
        "{:<26} {:<28} {:<22} {:<7} {:<16}",
        style("ID").bold(),
        style("NAME").bold(),
        style("WILAYA").bold(),
        style("IMAGES").bold(),
        style("UPDATED").bold()
    );
    println!("{}", "-".repeat(103));

    for place in places {
        let id = if place.id.starts_with("temp-") {
            style(truncate(&place.id, 26)).yellow()
        } else {
            style(truncate(&place.id, 26))
        };
        println!(
            "{:<26} {:<28} {:<22} {:<7} {:<16}",
            id,
            truncate(&place.name, 28),
            truncate(&wilaya_label(place.wilaya_code), 22),
            place.images.len(),
            format_time(&place.updated_at)
        );
    }

    println!();
    println!("{} place(s)", places.len());
}

async fn show(dashboard: &Dashboard, id: &str, format: OutputFormat) -> PlaceboardResult<()> {
    let detail = dashboard.place(id).await?;

    match format {
        OutputFormat::Json => print_json(&detail)?,
        OutputFormat::Plain => {
            for url in &detail.place.images {
                println!("{}", url);
            }
        }
        OutputFormat::Table => print_detail(&detail),
    }
    Ok(())
}

fn print_detail(detail: &PlaceDetail) {
    let ctx = UiContext::detect();
    let place = &detail.place;

    ui::intro(&ctx, &place.name);
    ui::key_value(&ctx, "ID", &place.id);
    ui::key_value(&ctx, "Wilaya", &wilaya_label(place.wilaya_code));
    if !place.description.is_empty() {
        ui::key_value(&ctx, "Description", &place.description);
    }
    ui::key_value(
        &ctx,
        "Created by",
        &format!("{} <{}>", detail.created_by.name, detail.created_by.email),
    );
    ui::key_value(&ctx, "Created", &format_time(&place.created_at));
    ui::key_value(&ctx, "Updated", &format_time(&place.updated_at));

    ui::section(&ctx, "Images");
    if place.images.is_empty() {
        ui::remark(&ctx, "none");
    }
    for url in &place.images {
        println!("  {}", url);
    }
}

/// Read image files before anything is sent
async fn read_images(paths: &[PathBuf]) -> PlaceboardResult<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = UploadFile::from_path(path)
            .await
            .map_err(|source| PlaceboardError::Upload {
                file: path.display().to_string(),
                source,
            })?;
        files.push(file);
    }
    Ok(files)
}

async fn create(dashboard: &mut Dashboard, args: CreatePlaceArgs) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let images = read_images(&args.images).await?;
    let selected = images.len();

    let progress = UploadProgress::new(&ctx);
    dashboard.on_upload(progress.observer());
    let form = CreatePlaceForm {
        fields: PlaceFields {
            name: args.name,
            description: args.description,
            wilaya_code: args.wilaya,
        },
        images,
    };
    let result = dashboard.create_place(form).await;
    progress.finish();

    let place = result?;
    ui::step_ok_detail(&ctx, &format!("Created {}", place.name), &place.id);
    if place.images.len() < selected {
        ui::step_warn_hint(
            &ctx,
            &format!("{} of {} image(s) uploaded", place.images.len(), selected),
            &format!("Add the rest with: placeboard places edit {} --image <path>", place.id),
        );
    }
    Ok(())
}

async fn edit(dashboard: &mut Dashboard, args: EditPlaceArgs) -> PlaceboardResult<()> {
    let ctx = UiContext::detect();
    let new_images = read_images(&args.images).await?;
    let selected = new_images.len();

    let progress = UploadProgress::new(&ctx);
    dashboard.on_upload(progress.observer());
    let edit = PlaceEdit {
        name: args.name,
        description: args.description,
        wilaya_code: args.wilaya,
        drop_images: args.drop_images,
        new_images,
    };
    let result = dashboard.edit_place(&args.id, edit).await;
    progress.finish();

    let place = result?;
    ui::step_ok_detail(&ctx, &format!("Updated {}", place.name), &place.id);
    if selected > 0 {
        ui::remark(&ctx, &format!("{} image(s) attached", place.images.len()));
    }
    Ok(())
}

async fn delete(dashboard: &Dashboard, id: &str, yes: bool) -> PlaceboardResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    if !ui::confirm(&ctx, &format!("Delete place {}?", id), false).await? {
        ui::step_warn_hint(&ctx, "Nothing deleted", "Pass --yes to skip the prompt");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Deleting place {}...", id));
    match dashboard.delete_place(id).await {
        Ok(()) => {
            spinner.stop(&format!("Place {} deleted", id));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Delete failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn wilaya_labels() {
        assert_eq!(wilaya_label(16), "16 Alger");
        assert_eq!(wilaya_label(1), "01 Adrar");
        assert_eq!(wilaya_label(77), "77");
    }

    #[tokio::test]
    async fn missing_image_names_the_path() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("casbah.jpg");
        std::fs::write(&present, b"\xFF\xD8\xFF").unwrap();
        let missing = temp.path().join("gone.jpg");

        let err = read_images(&[present.clone(), missing.clone()])
            .await
            .unwrap_err();
        match err {
            PlaceboardError::Upload { file, .. } => assert_eq!(file, missing.display().to_string()),
            other => panic!("unexpected error: {other}"),
        }

        let files = read_images(&[present]).await.unwrap();
        assert_eq!(files[0].name(), "casbah.jpg");
        assert_eq!(files[0].len(), 3);
    }
}
