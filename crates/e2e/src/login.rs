//! Sign-in flow preceding the spreadsheet session
//!
//! Purely sequential: every element must become visible within the login
//! wait, otherwise the run fails with a timeout.

use tracing::info;

use sheetprobe_common::Credentials;

use crate::driver::DriverTransport;
use crate::error::E2eResult;
use crate::layout::{LoginSelectors, Timings};
use crate::protocol::{Locator, MouseButton, PageId, Target};

pub struct LoginFlow<'a> {
    page: PageId,
    credentials: &'a Credentials,
    selectors: &'a LoginSelectors,
    timings: &'a Timings,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        page: PageId,
        credentials: &'a Credentials,
        selectors: &'a LoginSelectors,
        timings: &'a Timings,
    ) -> Self {
        Self {
            page,
            credentials,
            selectors,
            timings,
        }
    }

    /// Open the landing URL and follow the sign-in link.
    pub async fn goto<D: DriverTransport>(&self, driver: &mut D) -> E2eResult<()> {
        info!("Navigating to {}", self.credentials.url);
        driver
            .goto(
                self.page,
                &self.credentials.url,
                self.timings.navigation_timeout(),
            )
            .await?;

        let sign_in = self.target(Locator::role("link", &self.selectors.sign_in_link));
        self.wait_and_click(driver, &sign_in).await
    }

    /// Enter user name and password and decline "stay signed in".
    pub async fn login<D: DriverTransport>(&self, driver: &mut D) -> E2eResult<()> {
        let email = self.target(Locator::role("textbox", &self.selectors.email_textbox));
        driver.wait_visible(&email, self.timings.login_wait()).await?;
        driver
            .fill(
                &email,
                &self.credentials.username,
                self.timings.action_timeout(),
            )
            .await?;
        self.click(driver, &self.target(Locator::role("button", &self.selectors.next_button)))
            .await?;

        let use_password = self.target(Locator::role(
            "button",
            &self.selectors.use_password_button,
        ));
        self.wait_and_click(driver, &use_password).await?;

        let password = self.target(Locator::role("textbox", &self.selectors.password_textbox));
        driver.wait_visible(&password, self.timings.login_wait()).await?;
        driver
            .fill(
                &password,
                &self.credentials.password,
                self.timings.action_timeout(),
            )
            .await?;
        self.click(driver, &self.target(Locator::test_id(&self.selectors.submit_test_id)))
            .await?;

        let decline = self.target(Locator::test_id(
            &self.selectors.stay_signed_in_decline_test_id,
        ));
        self.wait_and_click(driver, &decline).await?;

        info!("Signed in as {}", self.credentials.username);
        Ok(())
    }

    fn target(&self, locator: Locator) -> Target {
        Target::on_page(self.page, locator)
    }

    async fn click<D: DriverTransport>(&self, driver: &mut D, target: &Target) -> E2eResult<()> {
        driver
            .click(target, MouseButton::Left, None, self.timings.action_timeout())
            .await
    }

    async fn wait_and_click<D: DriverTransport>(
        &self,
        driver: &mut D,
        target: &Target,
    ) -> E2eResult<()> {
        driver.wait_visible(target, self.timings.login_wait()).await?;
        self.click(driver, target).await
    }
}
