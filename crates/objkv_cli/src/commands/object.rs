//! Object allocation commands.

use super::{with_container, CliResult, Target};
use objkv_core::{Container, ObjectClass};

fn class_or_default(container: &Container, class: Option<&str>) -> CliResult<ObjectClass> {
    let name = class.unwrap_or(&container.config().default_class);
    Ok(container.classes().resolve(name)?)
}

/// Allocates a new KV object and prints its identifier.
pub fn newkv(target: &Target, class: Option<&str>) -> CliResult {
    let oid = with_container(target, true, |container| {
        let class = class_or_default(container, class)?;
        let kv = container.newkv_with_class(class)?;
        let oid = kv.oid();
        kv.close()?;
        Ok(oid)
    })?;
    println!("{oid}");
    Ok(())
}

/// Prints the root KV object identifier.
pub fn rootkv(target: &Target, class: Option<&str>) -> CliResult {
    let oid = with_container(target, false, |container| {
        let class = class_or_default(container, class)?;
        let kv = container.rootkv_with_class(class)?;
        let oid = kv.oid();
        kv.close()?;
        Ok(oid)
    })?;
    println!("{oid}");
    Ok(())
}
