use reqwest::{
    multipart::{Form, Part},
    Method,
};

use super::{
    decode,
    models::{NewPlant, Picture, PictureNoteUpdate, PictureUpload, Plant},
    GatewayClient, GatewayError,
};

impl GatewayClient {
    // -----------------------------------------------------------------------
    // Plants
    // -----------------------------------------------------------------------

    pub async fn plants(&self) -> Result<Vec<Plant>, GatewayError> {
        self.get_json("plants", "/Plant").await
    }

    pub async fn plant(&self, plant_id: i64) -> Result<Plant, GatewayError> {
        self.get_json("plant", &format!("/Plant/{plant_id}")).await
    }

    pub async fn create_plant(&self, plant: &NewPlant) -> Result<Plant, GatewayError> {
        validate_plant_name("plant creation", &plant.name)?;
        self.send_json(Method::POST, "plant creation", "/Plant", plant)
            .await
    }

    pub async fn update_plant(&self, plant_id: i64, plant: &NewPlant) -> Result<(), GatewayError> {
        validate_plant_name("plant update", &plant.name)?;
        self.send_unit(
            Method::PUT,
            "plant update",
            &format!("/Plant/{plant_id}"),
            Some(plant),
        )
        .await
    }

    pub async fn delete_plant(&self, plant_id: i64) -> Result<(), GatewayError> {
        self.send_unit::<()>(
            Method::DELETE,
            "plant deletion",
            &format!("/Plant/{plant_id}"),
            None,
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Pictures
    // -----------------------------------------------------------------------

    pub async fn pictures_for_plant(&self, plant_id: i64) -> Result<Vec<Picture>, GatewayError> {
        self.get_json("pictures", &format!("/Picture/plant/{plant_id}"))
            .await
    }

    /// Upload a picture as `multipart/form-data`.
    ///
    /// Parts: `file` (the image), `plantId`, and `note` when given.
    pub async fn upload_picture(&self, upload: PictureUpload) -> Result<Picture, GatewayError> {
        const RESOURCE: &str = "picture upload";

        if upload.bytes.is_empty() {
            return Err(GatewayError::InvalidRequest {
                resource: RESOURCE,
                reason: "picture file is empty".to_owned(),
            });
        }

        let mut file = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            file = file
                .mime_str(content_type)
                .map_err(|e| GatewayError::InvalidRequest {
                    resource: RESOURCE,
                    reason: format!("invalid content type {content_type:?}: {e}"),
                })?;
        }

        let mut form = Form::new()
            .text("plantId", upload.plant_id.to_string())
            .part("file", file);
        if let Some(note) = upload.note {
            form = form.text("note", note);
        }

        let url = self.url("/Picture");
        let request = self.request(Method::POST, &url).await.multipart(form);
        let bytes = self.execute(RESOURCE, &url, request).await?;
        decode(RESOURCE, &url, &bytes)
    }

    pub async fn update_picture_note(&self, picture_id: i64, note: &str) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PUT,
            "picture note update",
            &format!("/Picture/{picture_id}"),
            Some(&PictureNoteUpdate { note }),
        )
        .await
    }

    pub async fn delete_picture(&self, picture_id: i64) -> Result<(), GatewayError> {
        self.send_unit::<()>(
            Method::DELETE,
            "picture deletion",
            &format!("/Picture/{picture_id}"),
            None,
        )
        .await
    }
}

fn validate_plant_name(resource: &'static str, name: &str) -> Result<(), GatewayError> {
    if name.trim().is_empty() {
        return Err(GatewayError::InvalidRequest {
            resource,
            reason: "plant name must not be blank".to_owned(),
        });
    }
    Ok(())
}
