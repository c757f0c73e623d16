#[rocket::launch]
fn rocket() -> _ {
    catalog_sync::rocket()
}
