use aws_config::{Region, SdkConfig, meta::region::RegionProviderChain};

use crate::error::{Error, ErrorDetails};

/// Loads the ambient AWS configuration (credentials chain, region, retry defaults).
pub async fn config_with_region(region: Option<Region>) -> Result<SdkConfig, Error> {
    // Decide which AWS region to use. We try the following in order:
    // - The provided `region` argument
    // - The region defined by the environment (e.g. `AWS_REGION`, set by the Lambda runtime)
    // - The region from the shared AWS profile
    let region = RegionProviderChain::first_try(region)
        .or_default_provider()
        .region()
        .await
        .ok_or_else(|| {
            Error::new(ErrorDetails::Config {
                message: "Failed to determine AWS region. Set `aws.region` in the config file or the `AWS_REGION` environment variable.".to_string(),
            })
        })?;

    tracing::debug!("Creating new AWS config for region: {region}");

    Ok(aws_config::from_env().region(region).load().await)
}
